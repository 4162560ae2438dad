//! Bounded-retry readiness polling
//!
//! Every state-waiting operation in the lifecycle controller goes through
//! [`wait_for`]: evaluate a [`Probe`] until it reports ready or the attempt
//! budget in [`PollPolicy`] is spent.
//!
//! The wait is an ordinary future. Dropping it (for example from a
//! `tokio::select!` on Ctrl-C) abandons the remaining attempts.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;
use tracing::debug;

/// Default delay between two evaluations of a probe
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);

/// Default number of evaluations before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

/// Errors that can occur while waiting for a probe
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaitError {
    /// The attempt budget was consumed without the probe reporting ready
    #[error("Too many retries ({attempts} attempts). Last error: {}", .last_error.as_deref().unwrap_or("none"))]
    RetryExhausted {
        attempts: u32,
        last_error: Option<String>,
    },
}

impl WaitError {
    /// Number of probe evaluations performed before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            WaitError::RetryExhausted { attempts, .. } => *attempts,
        }
    }
}

/// Interval and attempt budget for a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between two evaluations (no delay before the first one)
    pub interval: Duration,
    /// Maximum number of evaluations
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PollPolicy {
    /// Create a policy with an explicit interval and attempt budget
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Worst-case time spent sleeping between evaluations
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// A readiness predicate
///
/// `Ok(())` means ready. `Err(cause)` means "not yet"; the cause of the last
/// failed evaluation is reported if the wait runs out of attempts.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Short description of what is being waited for, used in logs
    fn describe(&self) -> String;

    /// Evaluate the predicate once
    async fn probe(&self) -> Result<(), String>;
}

/// Evaluate `probe` until it reports ready or `policy.max_attempts` is reached
pub async fn wait_for<P>(probe: &P, policy: PollPolicy) -> Result<(), WaitError>
where
    P: Probe + ?Sized,
{
    if policy.max_attempts == 0 {
        return Err(WaitError::RetryExhausted {
            attempts: 0,
            last_error: None,
        });
    }

    let what = probe.describe();
    let what = what.as_str();
    let attempts = AtomicU32::new(0);

    // Retry::spawn makes one initial attempt plus one per strategy item
    let strategy = FixedInterval::new(policy.interval).take(policy.max_attempts as usize - 1);

    debug!(
        "Waiting for {} (up to {} attempts every {:?})",
        what, policy.max_attempts, policy.interval
    );

    let result = Retry::spawn(strategy, || {
        let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
        async move {
            let outcome = probe.probe().await;
            if let Err(cause) = &outcome {
                debug!("{} not ready (attempt {}): {}", what, attempt, cause);
            }
            outcome
        }
    })
    .await;

    match result {
        Ok(()) => {
            debug!(
                "{} ready after {} attempts",
                what,
                attempts.load(Ordering::Relaxed)
            );
            Ok(())
        }
        Err(cause) => Err(WaitError::RetryExhausted {
            attempts: attempts.load(Ordering::Relaxed),
            last_error: Some(cause),
        }),
    }
}
