//! CLI command definitions
//!
//! Defines the clap commands for the interop harness.

use clap::Subcommand;
use std::path::PathBuf;

use crate::harness::ClientVariant;

#[derive(Subcommand)]
pub enum Commands {
    /// Run one communication test between the staged server and a client
    Run {
        /// Client to run against the server
        #[arg(long, value_enum, default_value_t = ClientVariant::Tlstest)]
        client: ClientVariant,

        /// Architecture/build identifier, locates artifacts under the stage root
        arch: String,

        /// Subdomain under .localhost to test against
        subhostname: String,

        /// Subdomain under .localhost used for the certificate. Can contain wildcards
        certificate_subdomain: String,

        /// Expected client return code
        #[arg(default_value_t = 0, allow_negative_numbers = true)]
        client_returncode: i32,

        /// Expected server return code
        #[arg(default_value_t = 0, allow_negative_numbers = true)]
        server_returncode: i32,
    },

    /// Run every scenario of a YAML suite file
    Suite {
        /// Path to the YAML suite file
        path: PathBuf,

        /// Architecture for all scenarios, overriding the file
        #[arg(long)]
        arch: Option<String>,
    },
}
