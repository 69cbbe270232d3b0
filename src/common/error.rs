//! Error types for the interop harness
//!
//! Only conditions that abort a scenario are errors. An exit-code mismatch is
//! the thing under test and is reported through a failed verdict instead.

use std::io;
use std::path::Path;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Scenario Errors ===
    #[error("Failed to create certificates: {0}")]
    Provisioning(String),

    #[error("Server did not signal readiness within {0} seconds")]
    ReadinessTimeout(u64),

    #[error("Failed to launch {program}: {source}")]
    ProcessLaunch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to collect exit status of {label}: {source}")]
    ProcessWait {
        label: String,
        #[source]
        source: io::Error,
    },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a launch failure error for a program path
    pub fn process_launch(program: &Path, source: io::Error) -> Self {
        Self::ProcessLaunch {
            program: program.display().to_string(),
            source,
        }
    }

    /// Create a wait failure error for a labelled process
    pub fn process_wait(label: &str, source: io::Error) -> Self {
        Self::ProcessWait {
            label: label.to_string(),
            source,
        }
    }

    /// Create a file read error
    pub fn file_read(path: &Path, error: impl ToString) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}
