//! Test credential generation
//!
//! Produces a self-signed certificate and an unencrypted private key with
//! `openssl req`. The subject's common name is `<subdomain>.localhost`, and
//! the subdomain is passed through untouched so it may carry wildcards.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Serialize;
use tokio::process::Command;

use crate::common::paths::StageLayout;
use crate::common::{Error, Result};

const KEY_SPEC: &str = "rsa:4096";
const DIGEST: &str = "-sha256";
const VALIDITY_DAYS: u32 = 3650;

/// Certificate and key written for one scenario run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialBundle {
    pub certificate: PathBuf,
    pub private_key: PathBuf,
}

/// Subject distinguished name for a certificate subdomain
pub fn certificate_subject(subdomain: &str) -> String {
    format!("/CN={}", localhost_name(subdomain))
}

/// Fully qualified name under `.localhost`
pub fn localhost_name(label: &str) -> String {
    format!("{}.localhost", label)
}

/// Arguments for `openssl req` producing a self-signed pair
pub fn request_args(subdomain: &str, key: &Path, certificate: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["req", "-x509", "-newkey", KEY_SPEC, DIGEST, "-nodes", "-keyout"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(key.into());
    args.push("-out".into());
    args.push(certificate.into());
    args.push("-subj".into());
    args.push(certificate_subject(subdomain).into());
    args.push("-days".into());
    args.push(VALIDITY_DAYS.to_string().into());
    args
}

/// Runs the external certificate tool
#[derive(Debug, Clone)]
pub struct Provisioner {
    openssl: Option<PathBuf>,
}

impl Provisioner {
    /// `openssl` is `None` when the tool could not be located
    pub fn new(openssl: Option<PathBuf>) -> Self {
        Self { openssl }
    }

    /// Generate the stage's certificate and key for `subdomain`
    pub async fn provision(&self, subdomain: &str, layout: &StageLayout) -> Result<CredentialBundle> {
        let openssl = self
            .openssl
            .as_deref()
            .ok_or_else(|| Error::Provisioning("openssl not found in PATH".to_string()))?;

        std::fs::create_dir_all(layout.dir()).map_err(|e| {
            Error::Provisioning(format!(
                "cannot create '{}': {}",
                layout.dir().display(),
                e
            ))
        })?;

        let bundle = CredentialBundle {
            certificate: layout.certificate(),
            private_key: layout.private_key(),
        };

        tracing::info!(subject = %certificate_subject(subdomain), "Generating test certificate");

        let output = Command::new(openssl)
            .args(request_args(subdomain, &bundle.private_key, &bundle.certificate))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                Error::Provisioning(format!("failed to run {}: {}", openssl.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Provisioning(format!(
                "{} exited with code {:?}: {}",
                openssl.display(),
                output.status.code(),
                stderr.trim()
            )));
        }

        Ok(bundle)
    }
}
