//! TLS interop harness
//!
//! Validates that a TLS server and a TLS client interoperate by running both
//! as black-box processes, waiting for the server's liveness artifact and
//! comparing each side's exit code with the expected one.

pub mod cli;
pub mod commands;
pub mod common;
pub mod harness;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use testing::{Harness, Scenario, ScenarioReport, Verdict};
