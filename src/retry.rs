use failsafe::backoff;
use std::future::Future;
use std::time::Duration;

use crate::errors::AppError;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed(Duration),
    /// Doubling delay starting at `start`, capped at `max`.
    Exponential { start: Duration, max: Duration },
}

impl Backoff {
    /// Iterator of delays, one per retry.
    pub fn schedule(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        match *self {
            Backoff::Fixed(delay) => Box::new(backoff::constant(delay)),
            Backoff::Exponential { start, max } => Box::new(backoff::exponential(start, max)),
        }
    }
}

/// Explicit retry policy injected into every HTTP client.
///
/// # Presets
///
/// - `registry()`: retries transient failures only. A 429 is returned at once
///   so the fallback router can switch registries.
/// - `archive()`: retries transient failures and 429s with exponential backoff
///   capped at 120 seconds, matching the Wayback Machine's throttling.
/// - `none()`: a single attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub retry_on: fn(&AppError) -> bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff, retry_on: fn(&AppError) -> bool) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            retry_on,
        }
    }

    pub fn registry() -> Self {
        Self::new(
            3,
            Backoff::Exponential {
                start: Duration::from_secs(2),
                max: Duration::from_secs(30),
            },
            AppError::is_transient,
        )
    }

    pub fn archive() -> Self {
        Self::new(
            5,
            Backoff::Exponential {
                start: Duration::from_secs(1),
                max: Duration::from_secs(120),
            },
            |e| e.is_transient() || e.is_rate_limited(),
        )
    }

    pub fn none() -> Self {
        Self::new(1, Backoff::Fixed(Duration::ZERO), |_| false)
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or
    /// `max_attempts` is exhausted. The last error is returned.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut delays = self.backoff.schedule();
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && (self.retry_on)(&e) => {
                    let delay = delays.next().unwrap_or_default();
                    tracing::warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        label,
                        attempt,
                        self.max_attempts,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if attempt > 1 {
                        tracing::error!("{} gave up after {} attempts: {}", label, attempt, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::registry()
    }
}
