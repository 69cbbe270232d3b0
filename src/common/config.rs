//! Configuration file handling

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::paths::config_path;
use super::Result;
use crate::harness::poll::DEFAULT_POLL_INTERVAL;

/// Time the server has to create its liveness artifact
pub const DEFAULT_READINESS_SECS: u64 = 5;
/// Grace window for the client
pub const DEFAULT_CLIENT_GRACE_SECS: u64 = 5;
/// Grace window for the server once the client is done
pub const DEFAULT_SERVER_GRACE_SECS: u64 = 1;
/// Connect timeout for the raw TCP client
pub const DEFAULT_CONNECT_SECS: u64 = 1;
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 12345;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Where the server listens and the client connects
    #[serde(default)]
    pub network: NetworkConfig,

    /// Locations of build artifacts
    #[serde(default)]
    pub paths: PathsConfig,

    /// External tools
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Timeout settings
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// How long the server has to create its liveness artifact
    #[serde(default = "default_readiness")]
    pub readiness_secs: u64,

    /// Grace window for the client before it is killed
    #[serde(default = "default_client_grace")]
    pub client_grace_secs: u64,

    /// Grace window for the server once the client is done
    #[serde(default = "default_server_grace")]
    pub server_grace_secs: u64,

    /// Connect timeout for the raw TCP client
    #[serde(default = "default_connect")]
    pub connect_secs: u64,

    /// Sampling interval shared by every polling loop
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            readiness_secs: default_readiness(),
            client_grace_secs: default_client_grace(),
            server_grace_secs: default_server_grace(),
            connect_secs: default_connect(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Timeouts {
    pub fn readiness(&self) -> Duration {
        Duration::from_secs(self.readiness_secs)
    }

    pub fn client_grace(&self) -> Duration {
        Duration::from_secs(self.client_grace_secs)
    }

    pub fn server_grace(&self) -> Duration {
        Duration::from_secs(self.server_grace_secs)
    }

    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

fn default_readiness() -> u64 {
    DEFAULT_READINESS_SECS
}
fn default_client_grace() -> u64 {
    DEFAULT_CLIENT_GRACE_SECS
}
fn default_server_grace() -> u64 {
    DEFAULT_SERVER_GRACE_SECS
}
fn default_connect() -> u64 {
    DEFAULT_CONNECT_SECS
}
fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

/// Network settings shared by server and client
#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    #[serde(default = "default_server_address")]
    pub server_address: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_address: default_server_address(),
            port: default_port(),
        }
    }
}

fn default_server_address() -> String {
    DEFAULT_SERVER_ADDRESS.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Artifact locations
#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    /// Root of the staged build tree, relative to the working directory
    #[serde(default = "default_stage_root")]
    pub stage_root: PathBuf,

    /// Server binary, overriding `<stage>/<arch>/build/test/tlstestserver`
    pub server: Option<PathBuf>,

    /// Client binary, overriding `<stage>/<arch>/build/test/tlstest`
    pub client: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            stage_root: default_stage_root(),
            server: None,
            client: None,
        }
    }
}

fn default_stage_root() -> PathBuf {
    PathBuf::from("stage")
}

/// External tool settings
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ToolsConfig {
    /// Path to the openssl executable
    pub openssl: Option<PathBuf>,
}

impl ToolsConfig {
    /// Resolve the openssl executable
    ///
    /// Falls back to searching PATH if not explicitly configured
    pub fn openssl(&self) -> Option<PathBuf> {
        if let Some(path) = &self.openssl {
            return Some(path.clone());
        }
        which::which("openssl").ok()
    }
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                let content = std::fs::read_to_string(&path)
                    .map_err(|e| super::Error::file_read(&path, e))?;
                return Self::parse(&content);
            }
        }
        Ok(Self::default())
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}
