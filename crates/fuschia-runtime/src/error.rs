use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("execution cancelled")]
    Cancelled,

    #[error("unknown node type {node_type:?} for node {node_id}")]
    UnknownNodeType { node_id: String, node_type: String },

    #[error("node {node_id} failed: {source}")]
    NodeExecution {
        node_id: String,
        #[source]
        source: fuschia_node::NodeError,
    },

    #[error("node {node_id} input resolution failed: {message}")]
    InputResolution { node_id: String, message: String },

    #[error("credential resolution failed for node {node_id}: {message}")]
    Credential { node_id: String, message: String },

    #[error("invalid workflow: {message}")]
    InvalidWorkflow { message: String },
}
