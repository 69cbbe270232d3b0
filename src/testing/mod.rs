//! Interoperability scenarios
//!
//! Scenario definitions (from the command line or a YAML suite) and the
//! runner that drives the server and client through them.

mod config;
mod runner;

pub use config::*;
pub use runner::{print_report, Harness, ScenarioReport, Verdict};
