//! Bounded polling until an object reaches a target lifecycle state.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ApiError, FleetError, Result};
use crate::resource::Resource;

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(10);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// What to wait for and for how long.
#[derive(Debug, Clone)]
pub struct WaitSpec<S> {
    /// States in which waiting continues.
    pub pending: Vec<S>,
    /// States that end the wait successfully.
    pub target: Vec<S>,
    pub timeout: Duration,
    /// Grace period before the first refresh.
    pub delay: Duration,
    /// Lower bound between two refreshes.
    pub min_interval: Duration,
}

impl<S> WaitSpec<S> {
    pub fn new(pending: Vec<S>, target: Vec<S>) -> Self {
        Self {
            pending,
            target,
            timeout: DEFAULT_TIMEOUT,
            delay: Duration::ZERO,
            min_interval: Duration::ZERO,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }
}

/// Poll `refresh` until the reported state is in `spec.target`.
///
/// A state outside `pending ∪ target` fails immediately with
/// [`FleetError::UnexpectedState`]. Refresh failures are returned as
/// [`FleetError::Transport`] without retry. Once `spec.timeout` has elapsed
/// (counted from the call, grace period included) the wait fails with
/// [`FleetError::Timeout`] carrying the last observed state.
///
/// Intervals start at 100ms and double up to 10s, never below
/// `spec.min_interval` and never past the deadline.
pub async fn wait_for_state<R, S, F, Fut>(
    cancel: &CancellationToken,
    spec: &WaitSpec<S>,
    mut refresh: F,
) -> Result<R>
where
    R: Resource,
    S: PartialEq + fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<(R, S), ApiError>>,
{
    let start = Instant::now();
    let mut backoff = INITIAL_BACKOFF;
    let mut polls: u32 = 0;

    if !spec.delay.is_zero() {
        sleep_or_cancel(cancel, spec.delay).await?;
    }

    loop {
        let (resource, state) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FleetError::Cancelled),
            result = refresh() => result?,
        };
        polls += 1;
        debug!(kind = R::KIND, id = %resource.id(), %state, polls, "Polled state");

        if spec.target.contains(&state) {
            return Ok(resource);
        }
        if !spec.pending.contains(&state) {
            return Err(FleetError::UnexpectedState {
                kind: R::KIND,
                state: state.to_string(),
            });
        }

        let elapsed = start.elapsed();
        if elapsed >= spec.timeout {
            warn!(
                kind = R::KIND,
                id = %resource.id(),
                %state,
                elapsed_secs = elapsed.as_secs(),
                "Timeout waiting for state"
            );
            return Err(FleetError::Timeout {
                kind: R::KIND,
                last_state: state.to_string(),
                elapsed,
            });
        }

        let interval = backoff
            .max(spec.min_interval)
            .min(spec.timeout - elapsed);
        sleep_or_cancel(cancel, interval).await?;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

async fn sleep_or_cancel(cancel: &CancellationToken, duration: Duration) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FleetError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
