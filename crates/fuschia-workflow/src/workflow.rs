use std::collections::HashMap;

use fuschia_config::{ExecutionConfig, NodeConfig, WorkflowDef};

use crate::error::WorkflowError;
use crate::graph::Graph;

/// A validated workflow ready to be scheduled. Built once per `WorkflowDef`
/// and shared (read-only) across every execution of it; per-execution
/// mutable state lives in `ExecutionGraph`, not here.
#[derive(Debug, Clone)]
pub struct Workflow {
    pub workflow_id: String,
    pub name: String,
    pub nodes: HashMap<String, NodeConfig>,
    pub variables: HashMap<String, serde_json::Value>,
    pub execution_constraints: ExecutionConfig,
    graph: Graph,
}

impl Workflow {
    /// Build and validate a workflow from its wire-format definition.
    ///
    /// Validates that every connection references nodes that exist and that
    /// the workflow has at least one entry point (a node with no incoming
    /// non-loop-back edge) — a workflow where every node depends on another
    /// can never become ready.
    pub fn from_def(def: WorkflowDef) -> Result<Self, WorkflowError> {
        let nodes: HashMap<String, NodeConfig> =
            def.nodes.into_iter().map(|n| (n.node_id.clone(), n)).collect();

        for conn in &def.connections {
            if !nodes.contains_key(&conn.source_node_id) {
                return Err(WorkflowError::InvalidConnection {
                    connection_id: conn.connection_id.clone(),
                    node_id: conn.source_node_id.clone(),
                });
            }
            if !nodes.contains_key(&conn.target_node_id) {
                return Err(WorkflowError::InvalidConnection {
                    connection_id: conn.connection_id.clone(),
                    node_id: conn.target_node_id.clone(),
                });
            }
        }

        let graph = Graph::new(&nodes, &def.connections);
        if graph.entry_points().is_empty() && !nodes.is_empty() {
            return Err(WorkflowError::NoEntryPoints);
        }

        Ok(Self {
            workflow_id: def.workflow_id,
            name: def.name,
            nodes,
            variables: def.variables,
            execution_constraints: def.execution_constraints,
            graph,
        })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn get_node(&self, node_id: &str) -> Option<&NodeConfig> {
        self.nodes.get(node_id)
    }
}
