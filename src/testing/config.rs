//! Scenario configuration types
//!
//! A scenario comes either from command-line arguments or from an entry in
//! a YAML suite file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::common::{Error, Result};
use crate::harness::provision::localhost_name;
use crate::harness::ClientVariant;

/// One interoperability run
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    /// Name used in reports
    #[serde(default)]
    pub name: Option<String>,
    /// Architecture/build identifier, only used to locate artifacts
    #[serde(default)]
    pub arch: String,
    /// Client run against the server
    #[serde(default)]
    pub client: ClientVariant,
    /// Subdomain under `.localhost` the client expects to reach
    pub subhostname: String,
    /// Subdomain under `.localhost` the certificate is issued for; may
    /// contain wildcards
    pub certificate_subdomain: String,
    /// Expected client exit code
    #[serde(default)]
    pub client_returncode: i32,
    /// Expected server exit code
    #[serde(default)]
    pub server_returncode: i32,
}

impl Scenario {
    /// Hostname the client verifies against
    pub fn hostname(&self) -> String {
        localhost_name(&self.subhostname)
    }

    /// Name for reports, derived from the parameters when none was given
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!(
                "{} {} -> {} (client {}, server {})",
                self.client,
                self.hostname(),
                localhost_name(&self.certificate_subdomain),
                self.client_returncode,
                self.server_returncode
            ),
        }
    }
}

/// A YAML file holding several scenarios
#[derive(Deserialize, Debug)]
pub struct Suite {
    /// Name of the suite
    pub name: String,
    /// Optional description of what the suite covers
    pub description: Option<String>,
    /// Architecture applied to scenarios that do not name one
    pub arch: Option<String>,
    /// Scenarios, run in order
    pub scenarios: Vec<Scenario>,
}

impl Suite {
    /// Load and parse a suite file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read test suite '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse test suite: {}", e)))
    }

    /// Fill in the architecture of every scenario
    ///
    /// `override_arch` wins over everything; otherwise the suite's `arch`
    /// applies to scenarios that left theirs empty.
    pub fn resolve_arch(&mut self, override_arch: Option<&str>) -> Result<()> {
        for (i, scenario) in self.scenarios.iter_mut().enumerate() {
            if let Some(arch) = override_arch {
                scenario.arch = arch.to_string();
            } else if scenario.arch.is_empty() {
                match &self.arch {
                    Some(arch) => scenario.arch = arch.clone(),
                    None => {
                        return Err(Error::Config(format!(
                            "Scenario {} of suite '{}' has no arch; set it in the suite or pass --arch",
                            i + 1,
                            self.name
                        )))
                    }
                }
            }
        }
        Ok(())
    }
}
