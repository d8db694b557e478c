//! Explicit retry policies for the two unreliable external collaborators.
//!
//! Every retried operation in this crate runs under a [`RetryPolicy`] with a
//! fixed attempt budget; exhausting the budget yields a typed
//! [`RetriesExhausted`] error (or a documented best-effort result at the call
//! site) instead of looping forever.

use std::future::Future;
use std::time::Duration;

use log::warn;

#[derive(Debug, thiserror::Error)]
#[error("{operation} failed after {attempts} attempts: {source}")]
pub struct RetriesExhausted {
    pub operation: String,
    pub attempts: u32,
    #[source]
    pub source: anyhow::Error,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub factor: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            factor,
        }
    }

    /// Back-to-back retries with no delay between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, 1.0)
    }

    /// Delay to wait after the given failed attempt (1-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        Duration::from_secs_f64(self.base_delay.as_secs_f64() * self.factor.powi(exponent))
    }

    /// Run `op` until it succeeds or the attempt budget is spent.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, RetriesExhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(source) => {
                    if attempt >= self.max_attempts {
                        return Err(RetriesExhausted {
                            operation: operation.to_string(),
                            attempts: attempt,
                            source,
                        });
                    }
                    let delay = self.delay_after(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {:#}. Retrying in {:?}...",
                        operation, attempt, self.max_attempts, source, delay
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}
