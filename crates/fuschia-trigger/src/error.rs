use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("workflow {0:?} is already active")]
    AlreadyActive(String),

    #[error("workflow {0:?} is not active")]
    NotActive(String),

    #[error("unknown node type {node_type:?} for trigger node {node_id:?}")]
    UnknownNodeType { node_id: String, node_type: String },

    #[error("trigger node {node_id:?} failed to start monitoring: {message}")]
    StartFailed { node_id: String, message: String },
}
