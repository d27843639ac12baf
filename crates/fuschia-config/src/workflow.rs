use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::execution::ExecutionConfig;

/// A single node as it appears in a workflow definition, before resolution.
/// `node_type` is a registry key, not a Rust type — it is looked up in
/// `fuschia_node::NodeRegistry` at schedule time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub node_id: String,
    pub node_type: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Raw, unresolved config. May contain `{{dotted.path}}` template strings
    /// resolved against variables/credentials just before execution.
    #[serde(default)]
    pub config: Value,
    /// If set, the node's output is also written into `variables` under this
    /// key (or an auto-generated `_nodes.<slug>` key if absent).
    #[serde(default)]
    pub variable_name: Option<String>,
}

/// A directed edge between two node ports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub connection_id: String,
    pub source_node_id: String,
    #[serde(default = "default_port")]
    pub source_port: String,
    pub target_node_id: String,
    #[serde(default = "default_port")]
    pub target_port: String,
    /// Decision-branch tag (e.g. `"true"`/`"false"`) read by the
    /// decision-branch resolver. Absent for ordinary data edges.
    #[serde(default)]
    pub branch: Option<String>,
}

fn default_port() -> String {
    "value".to_string()
}

/// The top-level wire format for a workflow, as loaded from a file or
/// database blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDef {
    pub workflow_id: String,
    pub name: String,
    pub nodes: Vec<NodeConfig>,
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    #[serde(default)]
    pub execution_constraints: ExecutionConfig,
}
