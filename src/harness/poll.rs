//! Bounded polling
//!
//! Neither the server's readiness nor a child's termination is pushed to us,
//! so both are observed by sampling a predicate at a fixed interval. A
//! wall-clock timeout is converted into a sample budget up front: a 5 second
//! timeout at the default 100 ms interval is 50 samples.

use std::time::Duration;

/// Default sampling interval for every polling loop
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A sampling interval paired with the number of samples to take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    interval: Duration,
    samples: u32,
}

impl Poller {
    /// Poller that gives up after roughly `timeout` of wall-clock time
    pub fn for_timeout(timeout: Duration, interval: Duration) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        let samples = timeout.as_nanos().div_ceil(interval.as_nanos());
        Self {
            interval,
            samples: u32::try_from(samples).unwrap_or(u32::MAX),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sample budget, i.e. the number of sleeps before giving up
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Sample `predicate` until it holds or the budget is spent
    ///
    /// The predicate is checked before the first sleep and once more after the
    /// last one, so a zero budget still performs a single check.
    pub async fn poll_until<F>(&self, mut predicate: F) -> bool
    where
        F: FnMut() -> bool,
    {
        for _ in 0..self.samples {
            if predicate() {
                return true;
            }
            tokio::time::sleep(self.interval).await;
        }
        predicate()
    }
}
