//! TLS interop harness - drives a TLS server and client as external
//! processes and checks their exit codes
//!
//! Exits with 0 when every scenario passed and 1 otherwise.

use clap::Parser;
use tls_interop::{cli, commands, common::logging};
use commands::Commands;

#[derive(Parser)]
#[command(name = "tls-interop", about = "TLS server/client interoperability harness")]
#[command(version, long_about = None)]
struct Cli {
    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    logging::init_cli();

    let cli = Cli::parse();

    match cli::dispatch(cli.command, cli.json).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
