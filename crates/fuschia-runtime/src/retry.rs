use std::future::Future;
use std::time::Duration;

use fuschia_config::ExecutionConfig;
use fuschia_node::NodeError;
use tracing::warn;

/// Retry knobs lifted from a workflow's `ExecutionConfig`. No error
/// classification or jitter: every retryable `NodeError` is retried
/// uniformly, up to `max_retries` times.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl From<&ExecutionConfig> for RetryPolicy {
    fn from(config: &ExecutionConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_secs_f64(config.retry_delay_secs),
            max_backoff: Duration::from_secs_f64(config.max_retry_delay_secs),
            backoff_multiplier: config.backoff_multiplier,
        }
    }
}

impl RetryPolicy {
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let scaled = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_secs_f64(scaled.min(self.max_backoff.as_secs_f64()))
    }
}

/// Runs `operation` until it succeeds, returns a non-retryable error, or
/// exhausts `policy.max_retries` attempts, sleeping `backoff_delay(attempt)`
/// between tries.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, NodeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, NodeError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() || attempt >= policy.max_retries => return Err(err),
            Err(err) => {
                let delay = policy.backoff_delay(attempt);
                warn!(label, attempt, ?delay, error = %err, "retrying node execution");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
