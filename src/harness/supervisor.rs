//! Process supervision
//!
//! Launches a child with stdout and stderr merged into one capture and
//! enforces the bounded-wait-then-kill policy used for both the server and
//! the client. Output is captured into an anonymous temporary file rather
//! than a pipe, so a chatty child can never block on a full pipe while
//! nobody is reading it. The capture is only read after the child is gone.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use serde::Serialize;
use tokio::process::{Child, Command};

use super::poll::Poller;
use crate::common::{Error, Result};

/// Exit code reported when a status carries neither a code nor a signal
const UNKNOWN_EXIT_CODE: i32 = -1;

/// A launched child together with its output capture
#[derive(Debug)]
pub struct ManagedProcess {
    label: String,
    child: Child,
    capture: File,
}

impl ManagedProcess {
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }
}

/// Final state of a supervised process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessOutcome {
    pub exit_code: i32,
    /// Combined stdout and stderr
    pub output: String,
    /// Whether the supervisor had to kill the process
    pub killed: bool,
}

/// Launches children and bounds how long they may run
#[derive(Debug, Clone, Copy)]
pub struct Supervisor {
    poll_interval: Duration,
}

impl Supervisor {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Launch `program` without waiting for it
    ///
    /// Both output streams are redirected into the same capture so their
    /// relative order is preserved.
    pub fn start<I, S>(&self, label: &str, program: &Path, args: I) -> Result<ManagedProcess>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let capture = tempfile::tempfile()?;
        let stdout = capture.try_clone()?;
        let stderr = capture.try_clone()?;

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::process_launch(program, e))?;

        tracing::debug!(label, program = %program.display(), pid = ?child.id(), "Process started");

        Ok(ManagedProcess {
            label: label.to_string(),
            child,
            capture,
        })
    }

    /// Wait up to `grace` for the process to exit on its own, then kill it
    pub async fn await_termination(
        &self,
        mut process: ManagedProcess,
        grace: Duration,
    ) -> Result<ProcessOutcome> {
        let poller = Poller::for_timeout(grace, self.poll_interval);
        let mut status = None;
        let mut wait_error = None;

        poller
            .poll_until(|| match process.child.try_wait() {
                Ok(Some(exit)) => {
                    status = Some(exit);
                    true
                }
                Ok(None) => false,
                Err(e) => {
                    wait_error = Some(e);
                    true
                }
            })
            .await;

        if let Some(e) = wait_error {
            return Err(Error::process_wait(&process.label, e));
        }

        match status {
            Some(status) => {
                tracing::debug!(label = %process.label, ?status, "Process exited within grace window");
                collect(process, status, false)
            }
            None => {
                tracing::warn!(
                    label = %process.label,
                    grace_secs = grace.as_secs_f64(),
                    "Process still running after grace window, killing"
                );
                self.kill(process).await
            }
        }
    }

    /// Kill the process immediately and collect its status
    ///
    /// A process that already exited on its own keeps its real status and is
    /// not reported as killed.
    pub async fn kill(&self, mut process: ManagedProcess) -> Result<ProcessOutcome> {
        match process.child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!(label = %process.label, ?status, "Process already exited");
                return collect(process, status, false);
            }
            Ok(None) => {}
            Err(e) => return Err(Error::process_wait(&process.label, e)),
        }

        if let Err(e) = process.child.start_kill() {
            // Already reaped; the wait below still yields the real status
            tracing::debug!(label = %process.label, error = %e, "Kill not delivered");
        }
        let status = process
            .child
            .wait()
            .await
            .map_err(|e| Error::process_wait(&process.label, e))?;
        collect(process, status, true)
    }
}

fn collect(mut process: ManagedProcess, status: ExitStatus, killed: bool) -> Result<ProcessOutcome> {
    let mut bytes = Vec::new();
    process.capture.seek(SeekFrom::Start(0))?;
    process.capture.read_to_end(&mut bytes)?;

    Ok(ProcessOutcome {
        exit_code: exit_code(status),
        output: String::from_utf8_lossy(&bytes).into_owned(),
        killed,
    })
}

/// Map an exit status to an integer code
///
/// Signal deaths are reported as the negated signal number, so a process
/// killed with SIGKILL reports `-9`.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    UNKNOWN_EXIT_CODE
}
