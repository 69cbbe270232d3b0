//! Scenario runner
//!
//! Drives one scenario from credential generation to verdict. The steps are
//! strictly sequential:
//!
//! 1. generate the certificate and key
//! 2. remove a stale liveness artifact
//! 3. launch the server
//! 4. wait for the liveness artifact, killing the server if it never shows
//! 5. run the client variant
//! 6. bound the client's lifetime
//! 7. bound the server's lifetime
//! 8. compare observed exit codes with the expected ones
//!
//! Only credential generation, readiness and launch failures abort a run.
//! Wrong exit codes are the thing under test and end in a failed verdict.

use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::Serialize;

use crate::common::config::Config;
use crate::common::paths::StageLayout;
use crate::common::{Error, Result};
use crate::harness::client::{self, ClientVariant, ServerEndpoint};
use crate::harness::{
    await_readiness, CredentialBundle, ProcessOutcome, Provisioner, Supervisor,
};

use super::config::{Scenario, Suite};

/// Observed versus expected exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub expected_server: i32,
    pub observed_server: i32,
    pub expected_client: i32,
    pub observed_client: i32,
}

impl Verdict {
    pub fn server_ok(&self) -> bool {
        self.observed_server == self.expected_server
    }

    pub fn client_ok(&self) -> bool {
        self.observed_client == self.expected_client
    }

    pub fn passed(&self) -> bool {
        self.server_ok() && self.client_ok()
    }
}

/// Everything known about a finished scenario
#[derive(Debug, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub arch: String,
    pub client_variant: ClientVariant,
    /// Present when the run got as far as comparing exit codes
    pub verdict: Option<Verdict>,
    /// Reason the run was aborted
    pub error: Option<String>,
    pub server: Option<ProcessOutcome>,
    pub client: Option<ProcessOutcome>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.verdict.as_ref().is_some_and(Verdict::passed)
    }
}

/// Runs scenarios with one configuration
#[derive(Debug)]
pub struct Harness {
    config: Config,
    supervisor: Supervisor,
    provisioner: Provisioner,
}

impl Harness {
    pub fn new(config: Config) -> Self {
        let supervisor = Supervisor::new(config.timeouts.poll_interval());
        let provisioner = Provisioner::new(config.tools.openssl());
        Self {
            config,
            supervisor,
            provisioner,
        }
    }

    /// Run a single scenario to completion
    ///
    /// Never fails: aborted runs are reported with `error` set and no verdict.
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioReport {
        let mut run = Run::new(self, scenario);
        let result = run.execute().await;
        run.into_report(result)
    }

    /// Run every scenario of a suite, one after the other
    ///
    /// Scenarios share the server port and liveness artifact, so they are
    /// never run concurrently.
    pub async fn run_suite(&self, suite: &Suite) -> Vec<ScenarioReport> {
        let mut reports = Vec::with_capacity(suite.scenarios.len());
        for scenario in &suite.scenarios {
            reports.push(self.run_scenario(scenario).await);
        }
        reports
    }

    fn endpoint(&self) -> ServerEndpoint {
        ServerEndpoint {
            address: self.config.network.server_address.clone(),
            port: self.config.network.port,
        }
    }
}

/// State of a single run, dropped once the report is built
struct Run<'a> {
    harness: &'a Harness,
    scenario: &'a Scenario,
    layout: StageLayout,
    server: Option<ProcessOutcome>,
    client: Option<ProcessOutcome>,
}

impl<'a> Run<'a> {
    fn new(harness: &'a Harness, scenario: &'a Scenario) -> Self {
        let layout = StageLayout::new(&harness.config.paths.stage_root, &scenario.arch);
        Self {
            harness,
            scenario,
            layout,
            server: None,
            client: None,
        }
    }

    async fn execute(&mut self) -> Result<Verdict> {
        let harness = self.harness;
        let timeouts = &harness.config.timeouts;
        let supervisor = harness.supervisor;

        tracing::info!(arch = %self.scenario.arch, "Provisioning credentials");
        let bundle = harness
            .provisioner
            .provision(&self.scenario.certificate_subdomain, &self.layout)
            .await?;

        let artifact = self.layout.liveness_artifact();
        clear_liveness_artifact(&artifact)?;

        let server_binary = self.server_binary();
        tracing::info!(program = %server_binary.display(), "Starting server");
        let server = supervisor.start(
            "server",
            &server_binary,
            [
                bundle.certificate.as_os_str(),
                bundle.private_key.as_os_str(),
                artifact.as_os_str(),
            ],
        )?;

        if !await_readiness(&artifact, timeouts.readiness(), timeouts.poll_interval()).await {
            tracing::warn!(
                timeout_secs = timeouts.readiness_secs,
                "Server never became ready, killing it"
            );
            self.server = Some(supervisor.kill(server).await?);
            return Err(Error::ReadinessTimeout(timeouts.readiness_secs));
        }
        tracing::info!("Server is ready");

        let client = self.run_client(&bundle).await;

        // The server is bounded even when the client could not be launched
        let server = supervisor
            .await_termination(server, timeouts.server_grace())
            .await?;
        let observed_server = server.exit_code;
        self.server = Some(server);

        let observed_client = client?.exit_code;

        Ok(Verdict {
            expected_server: self.scenario.server_returncode,
            observed_server,
            expected_client: self.scenario.client_returncode,
            observed_client,
        })
    }

    async fn run_client(&mut self, bundle: &CredentialBundle) -> Result<ProcessOutcome> {
        let harness = self.harness;
        let timeouts = &harness.config.timeouts;
        let supervisor = harness.supervisor;
        let endpoint = harness.endpoint();
        let hostname = self.scenario.hostname();

        tracing::info!(variant = %self.scenario.client, %hostname, "Running client");
        let process = match self.scenario.client {
            ClientVariant::Tcp => {
                let outcome = client::probe_tcp(&endpoint, timeouts.connect()).await;
                self.client = Some(outcome.clone());
                return Ok(outcome);
            }
            ClientVariant::Openssl => {
                let openssl = harness.config.tools.openssl().ok_or_else(|| {
                    Error::process_launch(
                        Path::new("openssl"),
                        std::io::Error::new(std::io::ErrorKind::NotFound, "not found in PATH"),
                    )
                })?;
                supervisor.start(
                    "client",
                    &openssl,
                    client::openssl_client_args(&bundle.certificate, &endpoint, &hostname),
                )?
            }
            ClientVariant::Tlstest => supervisor.start(
                "client",
                &self.client_binary(),
                client::native_client_args(&bundle.certificate, &endpoint, &hostname),
            )?,
        };

        let outcome = supervisor
            .await_termination(process, timeouts.client_grace())
            .await?;
        self.client = Some(outcome.clone());
        Ok(outcome)
    }

    fn server_binary(&self) -> PathBuf {
        self.harness
            .config
            .paths
            .server
            .clone()
            .unwrap_or_else(|| self.layout.server_binary())
    }

    fn client_binary(&self) -> PathBuf {
        self.harness
            .config
            .paths
            .client
            .clone()
            .unwrap_or_else(|| self.layout.client_binary())
    }

    fn into_report(self, result: Result<Verdict>) -> ScenarioReport {
        let (verdict, error) = match result {
            Ok(verdict) => (Some(verdict), None),
            Err(e) => {
                tracing::error!(error = %e, "Scenario aborted");
                (None, Some(e.to_string()))
            }
        };

        ScenarioReport {
            name: self.scenario.display_name(),
            arch: self.scenario.arch.clone(),
            client_variant: self.scenario.client,
            verdict,
            error,
            server: self.server,
            client: self.client,
        }
    }
}

/// Remove a liveness artifact left behind by an earlier run
fn clear_liveness_artifact(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(artifact = %path.display(), "Removed stale liveness artifact");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Print a human-readable report with both processes' output
pub fn print_report(report: &ScenarioReport) {
    println!(
        "\n{} {}",
        "Running Test:".blue().bold(),
        report.name.white().bold()
    );

    if let Some(error) = &report.error {
        println!("  {} {}", "✗".red(), error);
    }

    if let Some(verdict) = &report.verdict {
        print_exit_line(
            "Server",
            verdict.observed_server,
            verdict.expected_server,
            report.server.as_ref(),
        );
        print_exit_line(
            "Client",
            verdict.observed_client,
            verdict.expected_client,
            report.client.as_ref(),
        );
    }

    print_output("Server output:", report.server.as_ref());
    print_output("Client output:", report.client.as_ref());

    if report.passed() {
        println!("\n{} {}\n", "✓".green().bold(), "Test passed".green().bold());
    } else {
        println!("\n{} {}\n", "✗".red().bold(), "Test failed".red().bold());
    }
}

fn print_exit_line(role: &str, observed: i32, expected: i32, outcome: Option<&ProcessOutcome>) {
    let killed = if outcome.is_some_and(|o| o.killed) {
        " (killed after grace window)".dimmed().to_string()
    } else {
        String::new()
    };
    let mark = if observed == expected {
        "✓".green()
    } else {
        "✗".red()
    };
    println!(
        "  {} {} exited with {} (expected {}){}",
        mark, role, observed, expected, killed
    );
}

fn print_output(title: &str, outcome: Option<&ProcessOutcome>) {
    println!("\n{}", title.cyan());
    match outcome {
        Some(outcome) if !outcome.output.is_empty() => print!("{}", outcome.output),
        _ => println!("{}", "(no output)".dimmed()),
    }
}
