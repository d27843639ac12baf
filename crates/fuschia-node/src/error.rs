use thiserror::Error;

use crate::port::PortMap;

/// Errors a `Node` implementation can return from `execute`, `handle_interaction`,
/// or the monitoring lifecycle methods.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("node {node_type} does not support this operation")]
    Unsupported { node_type: &'static str },

    #[error("missing required input on port {port}")]
    MissingInput { port: String },

    #[error("node execution failed: {message}")]
    Execution { message: String },

    #[error("node execution timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("node was cancelled")]
    Cancelled,

    #[error("credential error: {0}")]
    Credential(String),

    #[error("node returned output that does not match its declared ports: {message}")]
    InvalidOutput { message: String },

    /// A node reported failure through its own output map (an `error`/`_error`
    /// field, or `success: false`) rather than returning `Err`. Normalized here
    /// so retry/stop-on-error logic applies the same way it does to a raised
    /// error; the original outputs are kept for debugging.
    #[error("node reported failure in its output: {message}")]
    SoftError { outputs: PortMap, message: String },
}

impl NodeError {
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput {
            message: message.into(),
        }
    }

    /// Whether the engine should treat this as retryable. Every variant except
    /// cancellation is retried uniformly.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, NodeError::Cancelled)
    }
}
