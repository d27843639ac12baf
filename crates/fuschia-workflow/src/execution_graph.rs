use std::collections::{HashMap, HashSet};

use crate::workflow::Workflow;

/// Where a node sits in one execution's lifecycle. `Skipped` is terminal and
/// distinct from `Failed` — it means a decision branch or loop iteration
/// pruned the node, not that it errored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodePhase {
    Pending,
    Ready,
    Executing,
    Completed,
    Failed,
    Skipped,
    AwaitingInteraction,
}

/// Per-execution mutable scheduling state layered over a `Workflow`'s static
/// `Graph`. One `ExecutionGraph` exists per execution; it is rebuilt fresh
/// each time a workflow runs.
#[derive(Debug, Clone)]
pub struct ExecutionGraph {
    remaining_deps: HashMap<String, usize>,
    /// How many of a node's forward incoming edges have fired "live" (the
    /// upstream completed and, for a decision branch, this edge was the one
    /// taken) rather than been pruned. Zero live contributions when
    /// `remaining_deps` reaches zero means every path in was pruned.
    live_incoming: HashMap<String, usize>,
    phase: HashMap<String, NodePhase>,
    completed: HashSet<String>,
    failed: HashSet<String>,
    skipped: HashSet<String>,
    /// Nodes that only feed an Agent's `tools` port. These never become
    /// `Ready` on their own — they stay `Pending` until the Agent Node Runner
    /// Callback invokes them directly.
    tools_only: HashSet<String>,
}

/// What happened to a node's readiness when one of its dependencies
/// resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepTransition {
    /// Still waiting on other dependencies.
    Pending,
    /// Every dependency resolved and at least one fired live.
    Ready,
    /// Every dependency resolved but none fired live — prune this node too.
    Skipped,
}

impl ExecutionGraph {
    pub fn new(workflow: &Workflow) -> Self {
        let graph = workflow.graph();
        let mut remaining_deps = HashMap::new();
        let mut phase = HashMap::new();
        let tools_only = graph.tools_memory_only_nodes().clone();

        for node_id in workflow.nodes.keys() {
            let deps = graph.forward_in_degree(node_id);
            remaining_deps.insert(node_id.clone(), deps);
            let initial_phase = if deps == 0 && !tools_only.contains(node_id) {
                NodePhase::Ready
            } else {
                NodePhase::Pending
            };
            phase.insert(node_id.clone(), initial_phase);
        }

        Self {
            remaining_deps,
            live_incoming: HashMap::new(),
            phase,
            completed: HashSet::new(),
            failed: HashSet::new(),
            skipped: HashSet::new(),
            tools_only,
        }
    }

    pub fn phase(&self, node_id: &str) -> NodePhase {
        self.phase.get(node_id).copied().unwrap_or(NodePhase::Pending)
    }

    pub fn set_phase(&mut self, node_id: &str, phase: NodePhase) {
        self.phase.insert(node_id.to_string(), phase);
        self.completed.remove(node_id);
        self.failed.remove(node_id);
        self.skipped.remove(node_id);
        match phase {
            NodePhase::Completed => {
                self.completed.insert(node_id.to_string());
            }
            NodePhase::Failed => {
                self.failed.insert(node_id.to_string());
            }
            NodePhase::Skipped => {
                self.skipped.insert(node_id.to_string());
            }
            _ => {}
        }
    }

    pub fn remaining_deps(&self, node_id: &str) -> usize {
        self.remaining_deps.get(node_id).copied().unwrap_or(0)
    }

    pub fn set_remaining_deps(&mut self, node_id: &str, value: usize) {
        self.remaining_deps.insert(node_id.to_string(), value);
    }

/// Called when one of `node_id`'s incoming edges resolves. `live` is false
    /// when a decision branch pruned this particular edge. Once every
    /// incoming edge has resolved, the node becomes `Ready` if any edge fired
    /// live, or `Skipped` if every edge was pruned.
    pub fn decrement_dep(&mut self, node_id: &str, live: bool) -> DepTransition {
        let remaining = self.remaining_deps.entry(node_id.to_string()).or_insert(0);
        if *remaining > 0 {
            *remaining -= 1;
        }
        if live {
            *self.live_incoming.entry(node_id.to_string()).or_insert(0) += 1;
        }

        if *remaining > 0 || self.phase(node_id) != NodePhase::Pending {
            return DepTransition::Pending;
        }

        let has_live = self.live_incoming.get(node_id).copied().unwrap_or(0) > 0;
        if !has_live {
            self.set_phase(node_id, NodePhase::Skipped);
            return DepTransition::Skipped;
        }

        if self.tools_only.contains(node_id) {
            // Stays `Pending` forever via this path: a tools-memory-only node
            // only ever runs through the Agent Node Runner Callback, never
            // the ordinary ready-queue.
            return DepTransition::Pending;
        }

        self.set_phase(node_id, NodePhase::Ready);
        DepTransition::Ready
    }

    pub fn ready_nodes(&self) -> Vec<String> {
        self.phase
            .iter()
            .filter(|(_, phase)| **phase == NodePhase::Ready)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn completed(&self) -> &HashSet<String> {
        &self.completed
    }

    pub fn failed(&self) -> &HashSet<String> {
        &self.failed
    }

    pub fn skipped(&self) -> &HashSet<String> {
        &self.skipped
    }

    pub fn is_terminal(&self, node_id: &str) -> bool {
        matches!(
            self.phase(node_id),
            NodePhase::Completed | NodePhase::Failed | NodePhase::Skipped
        )
    }

    /// Every node still not in a terminal phase — the execution is done once
    /// this is empty (or nothing further can become ready). A tools-only node
    /// left `Pending` (no Agent ever called it through the runner callback)
    /// never blocks completion — it is invoked on demand, not awaited.
    pub fn outstanding(&self) -> Vec<String> {
        self.phase
            .iter()
            .filter(|(id, phase)| {
                !matches!(
                    phase,
                    NodePhase::Completed | NodePhase::Failed | NodePhase::Skipped
                ) && !(self.tools_only.contains(*id) && **phase == NodePhase::Pending)
            })
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuschia_config::{Connection, NodeConfig, WorkflowDef};
    use serde_json::json;

    fn def() -> WorkflowDef {
        let node = |id: &str| NodeConfig {
            node_id: id.to_string(),
            node_type: "test".to_string(),
            name: None,
            config: json!({}),
            variable_name: None,
        };
        WorkflowDef {
            workflow_id: "wf".to_string(),
            name: "wf".to_string(),
            nodes: vec![node("a"), node("b"), node("c")],
            connections: vec![
                Connection {
                    connection_id: "c1".to_string(),
                    source_node_id: "a".to_string(),
                    source_port: "value".to_string(),
                    target_node_id: "b".to_string(),
                    target_port: "value".to_string(),
                    branch: None,
                },
                Connection {
                    connection_id: "c2".to_string(),
                    source_node_id: "a".to_string(),
                    source_port: "value".to_string(),
                    target_node_id: "c".to_string(),
                    target_port: "value".to_string(),
                    branch: None,
                },
            ],
            variables: Default::default(),
            execution_constraints: Default::default(),
        }
    }

    #[test]
    fn entry_point_starts_ready() {
        let workflow = Workflow::from_def(def()).unwrap();
        let eg = ExecutionGraph::new(&workflow);
        assert_eq!(eg.phase("a"), NodePhase::Ready);
        assert_eq!(eg.phase("b"), NodePhase::Pending);
    }

    #[test]
    fn live_dependency_makes_node_ready() {
        let workflow = Workflow::from_def(def()).unwrap();
        let mut eg = ExecutionGraph::new(&workflow);
        let transition = eg.decrement_dep("b", true);
        assert_eq!(transition, DepTransition::Ready);
        assert_eq!(eg.phase("b"), NodePhase::Ready);
    }

    #[test]
    fn pruned_only_dependency_skips_node() {
        let workflow = Workflow::from_def(def()).unwrap();
        let mut eg = ExecutionGraph::new(&workflow);
        let transition = eg.decrement_dep("c", false);
        assert_eq!(transition, DepTransition::Skipped);
        assert_eq!(eg.phase("c"), NodePhase::Skipped);
    }
}
