use chrono::{DateTime, Utc};
use fuschia_node::PortMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The recorded outcome of one node execution (one attempt or the final
/// attempt of a retried run). `started_at` is stamped once, on the first
/// attempt, and must survive every retry of the same node so a client can
/// still see how long the node has been attempting to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExecutionResult {
    pub success: bool,
    pub outputs: PortMap,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Free-form result metadata. Carries `soft_error: true` when the node
    /// returned a value the engine treated as an error rather than raising
    /// one — set once and never cleared by a later retry.
    #[serde(default)]
    pub metadata: Value,
}

impl NodeExecutionResult {
    pub fn running(started_at: DateTime<Utc>) -> Self {
        Self {
            success: false,
            outputs: PortMap::new(),
            error: None,
            started_at,
            completed_at: None,
            metadata: Value::Object(Default::default()),
        }
    }

    pub fn is_soft_error(&self) -> bool {
        self.metadata
            .get("soft_error")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn mark_soft_error(&mut self) {
        if let Value::Object(map) = &mut self.metadata {
            map.insert("soft_error".to_string(), Value::Bool(true));
        }
    }
}
