//! Retry policy for remote submissions. Kept as an explicit object so the
//! backoff schedule is testable with a fake clock.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use linehaul_core::config::RetryConfig;
use linehaul_core::error::AssemblyResult;

/// Clock seam. Production uses [`TokioSleeper`]; tests record requested
/// delays instead of waiting.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Bounded retry with linear-multiple backoff, applied only to errors the
/// taxonomy marks retryable.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }

    /// Delay before the attempt following `attempt` (1-based): base times
    /// the attempt number.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    pub async fn run<T, F, Fut>(&self, sleeper: &dyn Sleeper, mut op: F) -> AssemblyResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AssemblyResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(attempt, ?delay, %err, "retryable submission failure, backing off");
                    sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linehaul_core::error::AssemblyError;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct FakeSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for FakeSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().push(duration);
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }

    #[tokio::test]
    async fn test_concurrent_modification_retries_with_growing_backoff() {
        let sleeper = FakeSleeper::default();
        let calls = Arc::new(AtomicU32::new(0));

        let calls_in_op = calls.clone();
        let result: AssemblyResult<u32> = policy()
            .run(&sleeper, move || {
                let calls = calls_in_op.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(AssemblyError::ConcurrentModification("order busy".to_string()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(
            *sleeper.delays.lock(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let sleeper = FakeSleeper::default();
        let result: AssemblyResult<()> = policy()
            .run(&sleeper, || async {
                Err(AssemblyError::ConcurrentModification("still busy".to_string()))
            })
            .await;

        assert!(result.unwrap_err().is_retryable());
        assert_eq!(sleeper.delays.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_errors_fail_fast() {
        let sleeper = FakeSleeper::default();
        let result: AssemblyResult<()> = policy()
            .run(&sleeper, || async {
                Err(AssemblyError::Api("PERMISSION_DENIED".to_string()))
            })
            .await;

        assert!(matches!(result.unwrap_err(), AssemblyError::Api(_)));
        assert!(sleeper.delays.lock().is_empty());
    }
}
