use serde::{Deserialize, Serialize};

/// Pool sizes, timeouts, and retry knobs for one workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub max_concurrent_nodes: usize,
    pub ai_concurrent_limit: usize,
    pub default_timeout_secs: u64,
    pub workflow_timeout_secs: u64,
    pub stop_on_error: bool,
    pub max_retries: u32,
    pub retry_delay_secs: f64,
    pub backoff_multiplier: f64,
    pub max_retry_delay_secs: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_nodes: 5,
            ai_concurrent_limit: 1,
            default_timeout_secs: 300,
            workflow_timeout_secs: 1800,
            stop_on_error: true,
            max_retries: 3,
            retry_delay_secs: 5.0,
            backoff_multiplier: 1.5,
            max_retry_delay_secs: 60.0,
        }
    }
}
