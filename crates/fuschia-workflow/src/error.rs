use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("connection {connection_id} references unknown node {node_id}")]
    InvalidConnection {
        connection_id: String,
        node_id: String,
    },

    #[error("no entry points found (every node depends on another)")]
    NoEntryPoints,
}
