//! Client variants
//!
//! Three ways of talking to the server under test: a bare TCP connect, the
//! `openssl s_client` reference client, and the project's own `tlstest`
//! client binary.

use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;

use super::supervisor::ProcessOutcome;

/// Which client is run against the server
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ClientVariant {
    /// Bare TCP connect, no TLS and no process
    #[value(alias = "raw-transport")]
    #[serde(alias = "raw-transport")]
    Tcp,
    /// `openssl s_client` with strict verification
    #[value(alias = "reference-tls-client")]
    #[serde(alias = "reference-tls-client")]
    Openssl,
    /// The staged `tlstest` client binary
    #[default]
    #[value(alias = "harness-native-client")]
    #[serde(alias = "harness-native-client")]
    Tlstest,
}

impl std::fmt::Display for ClientVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Tcp => "tcp",
            Self::Openssl => "openssl",
            Self::Tlstest => "tlstest",
        };
        f.write_str(name)
    }
}

/// Address the server listens on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    pub address: String,
    pub port: u16,
}

impl ServerEndpoint {
    pub fn authority(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Arguments for `openssl s_client`
///
/// The certificate is the only trust anchor, the hostname must match, and
/// any verification failure aborts the handshake.
pub fn openssl_client_args(
    certificate: &Path,
    endpoint: &ServerEndpoint,
    hostname: &str,
) -> Vec<OsString> {
    vec![
        "s_client".into(),
        "-quiet".into(),
        "-connect".into(),
        endpoint.authority().into(),
        "-CAfile".into(),
        certificate.into(),
        "-verify_hostname".into(),
        hostname.into(),
        "-verify_return_error".into(),
    ]
}

/// Arguments for the native client: `--file <pem> <address> <port> <hostname>`
pub fn native_client_args(
    certificate: &Path,
    endpoint: &ServerEndpoint,
    hostname: &str,
) -> Vec<OsString> {
    vec![
        "--file".into(),
        certificate.into(),
        endpoint.address.clone().into(),
        endpoint.port.to_string().into(),
        hostname.into(),
    ]
}

/// Connect without TLS and report the result as an exit code
///
/// A successful connect is `0`, anything else `1`. There is no process and
/// therefore no output.
pub async fn probe_tcp(endpoint: &ServerEndpoint, timeout: Duration) -> ProcessOutcome {
    let authority = endpoint.authority();
    let connected = match tokio::time::timeout(timeout, TcpStream::connect(&authority)).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(e)) => {
            tracing::info!(%authority, error = %e, "TCP connect failed");
            false
        }
        Err(_) => {
            tracing::info!(%authority, "TCP connect timed out");
            false
        }
    };

    ProcessOutcome {
        exit_code: if connected { 0 } else { 1 },
        output: String::new(),
        killed: false,
    }
}
