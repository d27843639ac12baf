use std::collections::{HashMap, HashSet};

use fuschia_config::{Connection, NodeConfig};

/// Static topology derived once from a workflow's nodes and connections:
/// adjacency for traversal, join/entry points, per-node ordered incoming
/// connections (for deterministic fan-in assembly), and the loop-back edge
/// set discovered by cycle detection.
#[derive(Debug, Clone)]
pub struct Graph {
    adjacency: HashMap<String, Vec<String>>,
    reverse_adjacency: HashMap<String, Vec<String>>,
    entry_points: Vec<String>,
    join_points: HashSet<String>,
    /// Connections targeting each node, in definition order — the order the
    /// input assembler walks when building a join's fan-in context.
    input_connections: HashMap<String, Vec<Connection>>,
    /// (source_node_id, target_node_id) pairs that close a cycle. Only these
    /// specific edges are loop-back; parallel non-cyclic edges between the
    /// same pair of nodes are not in this set.
    loop_back_edges: HashSet<(String, String)>,
    /// Nodes whose every outgoing connection targets a `"tools"` port —
    /// these produce values consumed only by an Agent's tool list and never
    /// participate in ordinary dependency-count fan-in.
    tools_memory_only_nodes: HashSet<String>,
}

impl Graph {
    pub fn new(nodes: &HashMap<String, NodeConfig>, connections: &[Connection]) -> Self {
        let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
        let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();
        let mut input_connections: HashMap<String, Vec<Connection>> = HashMap::new();

        for node_id in nodes.keys() {
            adjacency.entry(node_id.clone()).or_default();
            reverse_adjacency.entry(node_id.clone()).or_default();
            input_connections.entry(node_id.clone()).or_default();
        }

        for conn in connections {
            adjacency
                .entry(conn.source_node_id.clone())
                .or_default()
                .push(conn.target_node_id.clone());
            reverse_adjacency
                .entry(conn.target_node_id.clone())
                .or_default()
                .push(conn.source_node_id.clone());
            input_connections
                .entry(conn.target_node_id.clone())
                .or_default()
                .push(conn.clone());
        }

        let join_points: HashSet<String> = reverse_adjacency
            .iter()
            .filter(|(_, incoming)| incoming.len() > 1)
            .map(|(id, _)| id.clone())
            .collect();

        // Computed with no roots of its own — cycle detection falls back to
        // visiting every node, so this doesn't depend on `entry_points`.
        let loop_back_edges = find_loop_back_edges(&adjacency, &[]);

        // A node with incoming edges that are ALL loop-back (e.g. the single
        // entry into a self-contained loop) is still an entry point: nothing
        // outside the loop needs to complete first for it to become ready.
        let entry_points: Vec<String> = nodes
            .keys()
            .filter(|id| {
                reverse_adjacency
                    .get(*id)
                    .is_none_or(|incoming| incoming.iter().all(|src| loop_back_edges.contains(&(src.clone(), (*id).to_string()))))
            })
            .cloned()
            .collect();

        let tools_memory_only_nodes = nodes
            .keys()
            .filter(|id| {
                let out = adjacency.get(*id).map(|v| v.as_slice()).unwrap_or(&[]);
                !out.is_empty()
                    && connections
                        .iter()
                        .filter(|c| &c.source_node_id == *id)
                        .all(|c| c.target_port == "tools")
            })
            .cloned()
            .collect();

        Self {
            adjacency,
            reverse_adjacency,
            entry_points,
            join_points,
            input_connections,
            loop_back_edges,
            tools_memory_only_nodes,
        }
    }

    pub fn entry_points(&self) -> &[String] {
        &self.entry_points
    }

    pub fn downstream(&self, node_id: &str) -> &[String] {
        self.adjacency.get(node_id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn upstream(&self, node_id: &str) -> &[String] {
        self.reverse_adjacency.get(node_id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_join_point(&self, node_id: &str) -> bool {
        self.join_points.contains(node_id)
    }

    pub fn join_points(&self) -> &HashSet<String> {
        &self.join_points
    }

    pub fn input_connections(&self, node_id: &str) -> &[Connection] {
        self.input_connections.get(node_id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_loop_back(&self, source: &str, target: &str) -> bool {
        self.loop_back_edges.contains(&(source.to_string(), target.to_string()))
    }

    pub fn loop_back_edges(&self) -> &HashSet<(String, String)> {
        &self.loop_back_edges
    }

    pub fn has_loops(&self) -> bool {
        !self.loop_back_edges.is_empty()
    }

    pub fn is_tools_memory_only(&self, node_id: &str) -> bool {
        self.tools_memory_only_nodes.contains(node_id)
    }

    pub fn tools_memory_only_nodes(&self) -> &HashSet<String> {
        &self.tools_memory_only_nodes
    }

    /// In-degree counting only non-loop-back, non-`tools`-port incoming
    /// connections — the starting `remaining_deps` value for the scheduler.
    /// A `tools`-port connection feeds an Agent's tool list on demand via the
    /// node runner callback, not the ordinary dependency count, so it never
    /// makes the Agent wait on its source.
    pub fn forward_in_degree(&self, node_id: &str) -> usize {
        self.input_connections(node_id)
            .iter()
            .filter(|conn| conn.target_port != "tools")
            .filter(|conn| !self.is_loop_back(&conn.source_node_id, node_id))
            .count()
    }

    /// Every node reachable from `start` by following downstream edges,
    /// including `start` itself. Used by the decision-branch resolver and
    /// the loop controller's node-subset walk.
    pub fn reachable_from(&self, start: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack = vec![start.to_string()];
        while let Some(node) = stack.pop() {
            if !seen.insert(node.clone()) {
                continue;
            }
            for next in self.downstream(&node) {
                if !seen.contains(next) {
                    stack.push(next.clone());
                }
            }
        }
        seen
    }
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum Color {
    White,
    Gray,
    Black,
}

/// Three-color DFS cycle detection: any edge to a gray (on-stack) node is a
/// loop-back edge.
fn find_loop_back_edges(
    adjacency: &HashMap<String, Vec<String>>,
    entry_points: &[String],
) -> HashSet<(String, String)> {
    let mut color: HashMap<String, Color> =
        adjacency.keys().map(|k| (k.clone(), Color::White)).collect();
    let mut loop_back = HashSet::new();

    let mut remaining: Vec<&String> = adjacency.keys().collect();
    remaining.sort();

    let mut roots: Vec<String> = entry_points.to_vec();
    for node in remaining {
        if !roots.contains(node) {
            roots.push(node.clone());
        }
    }

    for root in roots {
        if color.get(&root).copied() != Some(Color::White) {
            continue;
        }
        visit(&root, adjacency, &mut color, &mut loop_back);
    }
    loop_back
}

fn visit(
    node: &str,
    adjacency: &HashMap<String, Vec<String>>,
    color: &mut HashMap<String, Color>,
    loop_back: &mut HashSet<(String, String)>,
) {
    color.insert(node.to_string(), Color::Gray);
    if let Some(children) = adjacency.get(node) {
        for child in children {
            match color.get(child).copied() {
                Some(Color::Gray) => {
                    loop_back.insert((node.to_string(), child.clone()));
                }
                Some(Color::White) | None => {
                    visit(child, adjacency, color, loop_back);
                }
                Some(Color::Black) => {}
            }
        }
    }
    color.insert(node.to_string(), Color::Black);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(id: &str) -> NodeConfig {
        NodeConfig {
            node_id: id.to_string(),
            node_type: "test".to_string(),
            name: None,
            config: json!({}),
            variable_name: None,
        }
    }

    fn conn(id: &str, from: &str, to: &str) -> Connection {
        Connection {
            connection_id: id.to_string(),
            source_node_id: from.to_string(),
            source_port: "value".to_string(),
            target_node_id: to.to_string(),
            target_port: "value".to_string(),
            branch: None,
        }
    }

    #[test]
    fn detects_entry_and_join_points() {
        let nodes: HashMap<String, NodeConfig> =
            ["a", "b", "c"].iter().map(|id| (id.to_string(), node(id))).collect();
        let connections = vec![conn("c1", "a", "c"), conn("c2", "b", "c")];
        let graph = Graph::new(&nodes, &connections);

        assert_eq!(graph.entry_points().len(), 2);
        assert!(graph.is_join_point("c"));
        assert!(!graph.is_join_point("a"));
    }

    #[test]
    fn detects_loop_back_edge() {
        let nodes: HashMap<String, NodeConfig> =
            ["a", "b"].iter().map(|id| (id.to_string(), node(id))).collect();
        let connections = vec![conn("c1", "a", "b"), conn("c2", "b", "a")];
        let graph = Graph::new(&nodes, &connections);

        assert!(graph.has_loops());
        assert!(graph.is_loop_back("b", "a"));
        assert!(!graph.is_loop_back("a", "b"));
        assert_eq!(graph.forward_in_degree("a"), 0);
    }

    #[test]
    fn tools_only_node_detected() {
        let nodes: HashMap<String, NodeConfig> =
            ["memory", "agent"].iter().map(|id| (id.to_string(), node(id))).collect();
        let mut tools_conn = conn("c1", "memory", "agent");
        tools_conn.target_port = "tools".to_string();
        let graph = Graph::new(&nodes, &[tools_conn]);

        assert!(graph.is_tools_memory_only("memory"));
        assert!(!graph.is_tools_memory_only("agent"));
    }
}
