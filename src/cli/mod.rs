//! CLI command handling
//!
//! Turns parsed commands into scenarios, runs them and prints the reports.

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::Result;
use crate::testing::{print_report, Harness, Scenario, ScenarioReport, Suite};

/// Dispatch a CLI command
///
/// Returns whether every scenario passed.
pub async fn dispatch(command: Commands, json: bool) -> Result<bool> {
    let config = Config::load()?;
    let harness = Harness::new(config);

    match command {
        Commands::Run {
            client,
            arch,
            subhostname,
            certificate_subdomain,
            client_returncode,
            server_returncode,
        } => {
            let scenario = Scenario {
                name: None,
                arch,
                client,
                subhostname,
                certificate_subdomain,
                client_returncode,
                server_returncode,
            };
            tracing::debug!(?scenario, "Running scenario");

            let report = harness.run_scenario(&scenario).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(report.passed())
        }

        Commands::Suite { path, arch } => {
            let mut suite = Suite::load(&path)?;
            suite.resolve_arch(arch.as_deref())?;

            if !json {
                println!(
                    "\n{} {}",
                    "Running Suite:".blue().bold(),
                    suite.name.white().bold()
                );
                if let Some(desc) = &suite.description {
                    println!("  {}", desc.dimmed());
                }
            }

            let reports = harness.run_suite(&suite).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in &reports {
                    print_report(report);
                }
                print_summary(&reports);
            }
            Ok(reports.iter().all(ScenarioReport::passed))
        }
    }
}

fn print_summary(reports: &[ScenarioReport]) {
    let passed = reports.iter().filter(|r| r.passed()).count();
    let total = reports.len();
    let line = format!("{}/{} scenarios passed", passed, total);
    if passed == total {
        println!("{}", line.green().bold());
    } else {
        println!("{}", line.red().bold());
        for report in reports.iter().filter(|r| !r.passed()) {
            println!("  {} {}", "✗".red(), report.name);
        }
    }
}
