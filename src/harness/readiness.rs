//! Server readiness detection
//!
//! The server creates a liveness artifact once its listening socket is bound.
//! Only the artifact's existence matters; it is never read, created or
//! removed here.

use std::path::Path;
use std::time::Duration;

use super::poll::Poller;

/// Wait until `artifact` exists, for at most about `timeout`
pub async fn await_readiness(artifact: &Path, timeout: Duration, interval: Duration) -> bool {
    let poller = Poller::for_timeout(timeout, interval);
    tracing::debug!(
        artifact = %artifact.display(),
        samples = poller.samples(),
        interval_ms = poller.interval().as_millis() as u64,
        "Waiting for liveness artifact"
    );

    let ready = poller.poll_until(|| artifact.exists()).await;
    if ready {
        tracing::debug!(artifact = %artifact.display(), "Liveness artifact observed");
    }
    ready
}
