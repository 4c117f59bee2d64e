use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::core::RetryPolicy;
use crate::error::{FetchError, Result};

/// Result of a retried operation and how many attempts it took.
#[derive(Debug)]
pub struct Attempted<T> {
    pub result:   Result<T>,
    pub attempts: u32,
}

/// Runs network operations under a [`RetryPolicy`], honouring cancellation.
#[derive(Debug, Clone)]
pub struct Retrier {
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl Retrier {
    pub fn new(policy: RetryPolicy, cancel: CancellationToken) -> Self { Self { policy, cancel } }

    /// Retries a request/response operation. The attempt timeout bounds each
    /// whole attempt.
    pub async fn call<T, F, Fut>(&self, what: &str, mut op: F) -> Attempted<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let timeout = self.policy.attempt_timeout;
        self.run(what, |attempt| bounded(timeout, op(attempt))).await
    }

    /// Retries an operation that applies [`bounded`] itself, around its
    /// network waits only. Local queueing (connection permits) and long
    /// bodies are not capped.
    pub async fn call_unbounded<T, F, Fut>(&self, what: &str, op: F) -> Attempted<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run(what, op).await
    }

    async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Attempted<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max = self.policy.attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;
            if self.cancel.is_cancelled() {
                return Attempted {
                    result:   Err(FetchError::Cancelled),
                    attempts: attempt - 1,
                };
            }

            let result = tokio::select! {
                _ = self.cancel.cancelled() => Err(FetchError::Cancelled),
                result = op(attempt) => result,
            };

            let err = match result {
                Ok(value) => {
                    return Attempted {
                        result:   Ok(value),
                        attempts: attempt,
                    };
                }
                Err(err) if err.is_retryable() && attempt < max => err,
                Err(err) => {
                    return Attempted {
                        result:   Err(err),
                        attempts: attempt,
                    };
                }
            };

            let delay = self.policy.jittered_delay(attempt - 1, &mut rand::rng());
            warn!(
                attempt,
                max_attempts = max,
                delay_ms = delay.as_millis() as u64,
                "{what} failed, retrying: {err}"
            );

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Attempted {
                        result:   Err(FetchError::Cancelled),
                        attempts: attempt,
                    };
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Applies an optional timeout to one future, mapping expiry to
/// [`FetchError::Timeout`].
pub async fn bounded<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| FetchError::Timeout(limit))?,
        None => fut.await,
    }
}
