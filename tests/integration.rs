//! End-to-end tests for the interop harness
//!
//! These tests run the `tls-interop` binary against fake server, client and
//! openssl scripts written into a temporary stage, and check the JSON report
//! and exit status.

#![cfg(unix)]

use std::env;
use std::fs;
use std::net::TcpListener;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use serde_json::Value;

const ARCH: &str = "x86_64-test";

/// Stand-in for `openssl`: `req` writes the key and a certificate holding
/// the subject, `s_client` echoes its arguments.
const FAKE_OPENSSL: &str = r#"#!/bin/sh
case "$1" in
  req)
    while [ $# -gt 0 ]; do
      case "$1" in
        -keyout) shift; key="$1" ;;
        -out) shift; cert="$1" ;;
        -subj) shift; subj="$1" ;;
      esac
      shift
    done
    echo "PRIVATE KEY" > "$key"
    echo "$subj" > "$cert"
    ;;
  s_client)
    echo "s_client $*"
    ;;
esac
"#;

const FAILING_OPENSSL: &str = "#!/bin/sh\necho 'unable to write key' >&2\nexit 1\n";

/// Server that signals readiness, logs, and exits cleanly
const SERVER_OK: &str = r#"#!/bin/sh
echo "server listening with $1 $2"
touch "$3"
sleep 0.3
echo "server done"
exit 0
"#;

/// Server that never signals readiness
const SERVER_NEVER_READY: &str = "#!/bin/sh\nsleep 30\n";

/// Server that signals readiness and then hangs
const SERVER_HANGS: &str = "#!/bin/sh\ntouch \"$3\"\nsleep 30\n";

/// Client that exits 0 only when called with the expected arguments
const CLIENT_CHECKS_ARGS: &str = r#"#!/bin/sh
echo "client $*"
[ "$1" = "--file" ] || exit 10
[ -f "$2" ] || exit 11
[ "$3" = "127.0.0.1" ] || exit 12
[ "$5" = "example.localhost" ] || exit 13
exit 0
"#;

const CLIENT_HANGS: &str = "#!/bin/sh\nsleep 30\n";

/// Test context with paths and cleanup
struct TestContext {
    /// Temporary directory for this test
    temp_dir: PathBuf,
    /// Config directory (XDG_CONFIG_HOME)
    config_dir: PathBuf,
    /// Path to the harness binary
    harness_bin: PathBuf,
    /// Stage root handed to the harness
    stage_root: PathBuf,
    /// Port the harness connects to
    port: u16,
    /// Client grace window written to the config
    client_grace_secs: u64,
}

impl TestContext {
    /// Create a new test context
    fn new(test_name: &str) -> Self {
        let temp_dir = env::temp_dir().join("tls-interop-tests").join(test_name);

        // Clean up any previous test artifacts
        let _ = fs::remove_dir_all(&temp_dir);
        fs::create_dir_all(&temp_dir).expect("Failed to create temp dir");

        let config_dir = temp_dir.join("config");
        let stage_root = temp_dir.join("stage");
        fs::create_dir_all(&config_dir).expect("Failed to create config dir");

        Self {
            temp_dir,
            config_dir,
            harness_bin: PathBuf::from(env!("CARGO_BIN_EXE_tls-interop")),
            stage_root,
            port: unused_port(),
            client_grace_secs: 2,
        }
    }

    fn stage_dir(&self) -> PathBuf {
        self.stage_root.join(ARCH).join("build").join("test")
    }

    /// Write an executable script into the temp dir
    fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.temp_dir.join(name);
        fs::write(&path, body).expect("Failed to write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to chmod script");
        path
    }

    /// Write the config file pointing at the given fakes
    fn create_config(&self, server: &Path, client: &Path, openssl: &Path) {
        let config_content = format!(
            r#"
[timeouts]
readiness_secs = 2
client_grace_secs = {client_grace}
server_grace_secs = 1
connect_secs = 1
poll_interval_ms = 50

[network]
server_address = "127.0.0.1"
port = {port}

[paths]
stage_root = "{stage_root}"
server = "{server}"
client = "{client}"

[tools]
openssl = "{openssl}"
"#,
            port = self.port,
            client_grace = self.client_grace_secs,
            stage_root = self.stage_root.display(),
            server = server.display(),
            client = client.display(),
            openssl = openssl.display(),
        );

        let config_path = self.config_dir.join("tls-interop").join("config.toml");
        fs::create_dir_all(config_path.parent().unwrap()).expect("Failed to create config dir");
        fs::write(&config_path, config_content).expect("Failed to write config");
    }

    /// Standard setup: fake openssl plus the given server and client bodies
    fn setup(&self, server: &str, client: &str) {
        let server = self.script("server.sh", server);
        let client = self.script("client.sh", client);
        let openssl = self.script("openssl.sh", FAKE_OPENSSL);
        self.create_config(&server, &client, &openssl);
    }

    /// Run the harness with `--json` and parse its report
    fn run_harness(&self, args: &[&str]) -> HarnessOutput {
        let output = Command::new(&self.harness_bin)
            .arg("--json")
            .args(args)
            .env("XDG_CONFIG_HOME", &self.config_dir)
            .env("RUST_LOG", "tls_interop=debug")
            .output()
            .expect("Failed to run harness");

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let report = serde_json::from_str(&stdout).unwrap_or(Value::Null);

        HarnessOutput {
            report,
            stdout,
            stderr,
            code: output.status.code(),
        }
    }

    fn run_scenario(&self, args: &[&str]) -> HarnessOutput {
        let mut full = vec!["run"];
        full.extend_from_slice(args);
        self.run_harness(&full)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.temp_dir);
    }
}

struct HarnessOutput {
    report: Value,
    stdout: String,
    stderr: String,
    code: Option<i32>,
}

impl HarnessOutput {
    fn assert_code(&self, expected: i32) {
        assert_eq!(
            self.code,
            Some(expected),
            "unexpected exit status\nstdout: {}\nstderr: {}",
            self.stdout,
            self.stderr
        );
    }
}

/// A port nothing is listening on
fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    listener.local_addr().unwrap().port()
}

#[test]
fn test_native_client_matching_codes_passes() {
    let ctx = TestContext::new("native_pass");
    ctx.setup(SERVER_OK, CLIENT_CHECKS_ARGS);

    let out = ctx.run_scenario(&[ARCH, "example", "example", "0", "0"]);
    out.assert_code(0);

    let report = &out.report;
    assert_eq!(report["verdict"]["observed_client"], 0);
    assert_eq!(report["verdict"]["observed_server"], 0);
    assert_eq!(report["client_variant"], "tlstest");
    assert!(report["error"].is_null());

    let server_output = report["server"]["output"].as_str().unwrap();
    assert!(server_output.contains("server listening"));
    assert!(server_output.contains("server done"));
    assert!(report["client"]["output"]
        .as_str()
        .unwrap()
        .contains("--file"));

    // Credentials land in the stage directory
    let cert = fs::read_to_string(ctx.stage_dir().join("test.pem")).unwrap();
    assert_eq!(cert.trim(), "/CN=example.localhost");
    assert!(ctx.stage_dir().join("test.key").exists());
}

#[test]
fn test_expected_client_mismatch_fails_without_error() {
    let ctx = TestContext::new("native_mismatch");
    ctx.setup(SERVER_OK, CLIENT_CHECKS_ARGS);

    let out = ctx.run_scenario(&[ARCH, "example", "example", "1", "0"]);
    out.assert_code(1);

    let verdict = &out.report["verdict"];
    assert_eq!(verdict["observed_client"], 0);
    assert_eq!(verdict["expected_client"], 1);
    assert_eq!(verdict["observed_server"], 0);
    assert!(out.report["error"].is_null());
}

#[test]
fn test_wrong_hostname_is_observed() {
    let ctx = TestContext::new("native_wrong_host");
    ctx.setup(SERVER_OK, CLIENT_CHECKS_ARGS);

    let out = ctx.run_scenario(&[ARCH, "other", "example", "13", "0"]);
    out.assert_code(0);
    assert_eq!(out.report["verdict"]["observed_client"], 13);
}

#[test]
fn test_readiness_timeout_kills_server_and_skips_client() {
    let ctx = TestContext::new("readiness_timeout");
    ctx.setup(SERVER_NEVER_READY, CLIENT_CHECKS_ARGS);

    let start = Instant::now();
    let out = ctx.run_scenario(&[ARCH, "example", "example"]);
    let elapsed = start.elapsed();
    out.assert_code(1);

    assert!(out.report["verdict"].is_null());
    assert!(out.report["client"].is_null());
    assert_eq!(out.report["server"]["killed"], true);
    assert!(out.report["error"]
        .as_str()
        .unwrap()
        .contains("did not signal readiness"));
    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_secs(20));
}

#[test]
fn test_stale_liveness_artifact_is_cleared() {
    let ctx = TestContext::new("stale_artifact");
    ctx.setup(SERVER_NEVER_READY, CLIENT_CHECKS_ARGS);

    fs::create_dir_all(ctx.stage_dir()).unwrap();
    fs::write(ctx.stage_dir().join("pid"), "4242").unwrap();

    let out = ctx.run_scenario(&[ARCH, "example", "example"]);
    out.assert_code(1);
    assert!(out.report["error"]
        .as_str()
        .unwrap()
        .contains("did not signal readiness"));
    assert!(!ctx.stage_dir().join("pid").exists());
}

#[test]
fn test_overdue_server_is_killed_after_grace() {
    let mut ctx = TestContext::new("server_overdue");
    // Server grace stays at 1 s; a kill near 6 s would mean the wrong window
    ctx.client_grace_secs = 6;
    ctx.setup(SERVER_HANGS, CLIENT_CHECKS_ARGS);

    let start = Instant::now();
    let out = ctx.run_scenario(&[ARCH, "example", "example", "0", "-9"]);
    let elapsed = start.elapsed();
    out.assert_code(0);
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(4), "took {:?}", elapsed);
    assert_eq!(out.report["verdict"]["observed_server"], -9);
    assert_eq!(out.report["server"]["killed"], true);
    assert_eq!(out.report["client"]["killed"], false);
}

#[test]
fn test_overdue_client_is_killed_after_grace() {
    let ctx = TestContext::new("client_overdue");
    ctx.setup(SERVER_OK, CLIENT_HANGS);

    let start = Instant::now();
    let out = ctx.run_scenario(&[ARCH, "example", "example", "0", "0"]);
    let elapsed = start.elapsed();
    out.assert_code(1);

    assert_eq!(out.report["verdict"]["observed_client"], -9);
    assert_eq!(out.report["client"]["killed"], true);
    assert_eq!(out.report["verdict"]["observed_server"], 0);
    assert!(elapsed >= Duration::from_secs(2));
}

#[test]
fn test_text_report_shows_empty_tcp_client_output() {
    let ctx = TestContext::new("tcp_text_report");
    ctx.setup(SERVER_OK, CLIENT_CHECKS_ARGS);

    let output = Command::new(&ctx.harness_bin)
        .args(["run", "--client", "tcp", ARCH, "example", "example", "1", "0"])
        .env("XDG_CONFIG_HOME", &ctx.config_dir)
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to run harness");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(0), "stdout: {}", stdout);
    assert!(stdout.contains("Client output:\n(no output)"));
}

#[test]
fn test_tcp_client_without_listener_observes_failure() {
    let ctx = TestContext::new("tcp_closed");
    ctx.setup(SERVER_OK, CLIENT_CHECKS_ARGS);

    let out = ctx.run_scenario(&["--client", "tcp", ARCH, "example", "example", "1", "0"]);
    out.assert_code(0);
    assert_eq!(out.report["verdict"]["observed_client"], 1);
    assert_eq!(out.report["client"]["output"], "");
}

#[test]
fn test_tcp_client_with_listener_connects() {
    let mut ctx = TestContext::new("tcp_open");
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    ctx.port = listener.local_addr().unwrap().port();
    ctx.setup(SERVER_OK, CLIENT_CHECKS_ARGS);

    let out = ctx.run_scenario(&["--client", "raw-transport", ARCH, "example", "example"]);
    out.assert_code(0);
    assert_eq!(out.report["verdict"]["observed_client"], 0);
    assert_eq!(out.report["client_variant"], "tcp");
    drop(listener);
}

#[test]
fn test_openssl_client_arguments() {
    let ctx = TestContext::new("openssl_client");
    ctx.setup(SERVER_OK, CLIENT_CHECKS_ARGS);

    let out = ctx.run_scenario(&["--client", "openssl", ARCH, "example", "*.test"]);
    out.assert_code(0);

    let client_output = out.report["client"]["output"].as_str().unwrap();
    assert!(client_output.contains("-connect 127.0.0.1:"));
    assert!(client_output.contains("-verify_hostname example.localhost"));
    assert!(client_output.contains("-verify_return_error"));

    let cert = fs::read_to_string(ctx.stage_dir().join("test.pem")).unwrap();
    assert_eq!(cert.trim(), "/CN=*.test.localhost");
}

#[test]
fn test_provisioning_failure_aborts_before_server() {
    let ctx = TestContext::new("provisioning_failure");
    let server = ctx.script("server.sh", SERVER_OK);
    let client = ctx.script("client.sh", CLIENT_CHECKS_ARGS);
    let openssl = ctx.script("openssl.sh", FAILING_OPENSSL);
    ctx.create_config(&server, &client, &openssl);

    let out = ctx.run_scenario(&[ARCH, "example", "example"]);
    out.assert_code(1);
    assert!(out.report["server"].is_null());
    assert!(out.report["client"].is_null());
    let error = out.report["error"].as_str().unwrap();
    assert!(error.contains("Failed to create certificates"));
    assert!(error.contains("unable to write key"));
    assert!(!ctx.stage_dir().join("pid").exists());
}

#[test]
fn test_missing_server_binary_fails_fast() {
    let ctx = TestContext::new("missing_server");
    let client = ctx.script("client.sh", CLIENT_CHECKS_ARGS);
    let openssl = ctx.script("openssl.sh", FAKE_OPENSSL);
    ctx.create_config(&ctx.temp_dir.join("no-such-server"), &client, &openssl);

    let start = Instant::now();
    let out = ctx.run_scenario(&[ARCH, "example", "example"]);
    out.assert_code(1);
    assert!(out.report["error"]
        .as_str()
        .unwrap()
        .contains("Failed to launch"));
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_suite_runs_every_scenario() {
    let ctx = TestContext::new("suite");
    ctx.setup(SERVER_OK, CLIENT_CHECKS_ARGS);

    let suite = ctx.temp_dir.join("suite.yaml");
    fs::write(
        &suite,
        format!(
            r#"
name: communication
arch: {ARCH}
scenarios:
  - name: matching names
    subhostname: example
    certificate_subdomain: example
  - name: nobody listening
    client: tcp
    subhostname: example
    certificate_subdomain: example
    client_returncode: 1
  - name: wrong expectation
    subhostname: example
    certificate_subdomain: example
    client_returncode: 3
"#
        ),
    )
    .unwrap();

    let out = ctx.run_harness(&["suite", suite.to_str().unwrap()]);
    out.assert_code(1);

    let reports = out.report.as_array().expect("suite report is an array");
    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0]["name"], "matching names");
    assert_eq!(reports[0]["verdict"]["observed_client"], 0);
    assert_eq!(reports[1]["verdict"]["observed_client"], 1);
    assert_eq!(reports[2]["verdict"]["expected_client"], 3);
    assert_eq!(reports[2]["verdict"]["observed_client"], 0);
}

#[test]
fn test_text_report_shows_outputs() {
    let ctx = TestContext::new("text_report");
    ctx.setup(SERVER_OK, CLIENT_CHECKS_ARGS);

    let output = Command::new(&ctx.harness_bin)
        .args(["run", ARCH, "example", "example"])
        .env("XDG_CONFIG_HOME", &ctx.config_dir)
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to run harness");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(0), "stdout: {}", stdout);
    assert!(stdout.contains("Server output:"));
    assert!(stdout.contains("server done"));
    assert!(stdout.contains("Client output:"));
    assert!(stdout.contains("Test passed"));
}
