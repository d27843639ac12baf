use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::result::NodeExecutionResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Stopped,
}

/// How an execution was started — carried through so nodes and sinks can
/// tell a manual run from one a trigger spawned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Manual,
    Trigger,
}

/// Mutable state for one workflow execution: node results so far, the
/// variable bag (`trigger_data`, `_nodes.*`, user-declared variables) used
/// for node-config template resolution, and anything paused awaiting human
/// interaction.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub execution_id: String,
    pub workflow_id: String,
    pub execution_mode: ExecutionMode,
    pub started_by: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: ExecutionStatus,
    pub node_results: HashMap<String, NodeExecutionResult>,
    pub variables: HashMap<String, Value>,
    pub errors: Vec<String>,
    /// node_id -> the form payload a paused interactive node surfaced.
    pub pending_interactions: HashMap<String, Value>,
    pub frontend_origin: Option<String>,
}

impl ExecutionContext {
    pub fn new(
        execution_id: String,
        workflow_id: String,
        execution_mode: ExecutionMode,
        variables: HashMap<String, Value>,
    ) -> Self {
        Self {
            execution_id,
            workflow_id,
            execution_mode,
            started_by: None,
            started_at: Utc::now(),
            completed_at: None,
            status: ExecutionStatus::Pending,
            node_results: HashMap::new(),
            variables,
            errors: Vec::new(),
            pending_interactions: HashMap::new(),
            frontend_origin: None,
        }
    }

    pub fn record_result(&mut self, node_id: impl Into<String>, result: NodeExecutionResult) {
        self.node_results.insert(node_id.into(), result);
    }

    /// Writes a node's output into the `_nodes.<variable_key>` namespace and,
    /// if the node declares a `variable_name`, also under that top-level key
    /// — this is what later nodes' `{{...}}` config templates see.
    pub fn publish_variables(
        &mut self,
        variable_key: &str,
        explicit_name: Option<&str>,
        output: &Value,
    ) {
        let nodes_ns = self
            .variables
            .entry("_nodes".to_string())
            .or_insert_with(|| Value::Object(Default::default()));
        if let Value::Object(map) = nodes_ns {
            map.insert(variable_key.to_string(), output.clone());
        }
        if let Some(name) = explicit_name {
            self.variables.insert(name.to_string(), output.clone());
        }
    }
}
