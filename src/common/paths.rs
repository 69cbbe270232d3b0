//! Stage layout and configuration paths
//!
//! Build artifacts for an architecture live under
//! `<stage_root>/<arch>/build/test/`: the server and client binaries, the
//! generated certificate and key, and the server's liveness artifact.

use std::path::{Path, PathBuf};

/// Name used for the configuration directory
const APP_NAME: &str = "tls-interop";

const CERTIFICATE_FILE: &str = "test.pem";
const KEY_FILE: &str = "test.key";
const LIVENESS_FILE: &str = "pid";
const SERVER_BINARY: &str = "tlstestserver";
const CLIENT_BINARY: &str = "tlstest";

/// Paths derived from a stage root and an architecture identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageLayout {
    dir: PathBuf,
}

impl StageLayout {
    pub fn new(stage_root: &Path, arch: &str) -> Self {
        Self {
            dir: stage_root.join(arch).join("build").join("test"),
        }
    }

    /// Directory holding every per-arch test artifact
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn certificate(&self) -> PathBuf {
        self.dir.join(CERTIFICATE_FILE)
    }

    pub fn private_key(&self) -> PathBuf {
        self.dir.join(KEY_FILE)
    }

    /// File the server creates once it is listening
    pub fn liveness_artifact(&self) -> PathBuf {
        self.dir.join(LIVENESS_FILE)
    }

    pub fn server_binary(&self) -> PathBuf {
        self.dir.join(SERVER_BINARY)
    }

    pub fn client_binary(&self) -> PathBuf {
        self.dir.join(CLIENT_BINARY)
    }
}

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/tls-interop/`
/// - macOS: `~/Library/Application Support/tls-interop/`
/// - Windows: `%APPDATA%\tls-interop\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
