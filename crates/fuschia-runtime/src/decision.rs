use std::collections::HashSet;

use fuschia_config::Connection;
use fuschia_node::PortMap;
use fuschia_workflow::Graph;
use serde_json::Value;

/// Splits a node's outgoing connections into the ones that stay live and the
/// ones a decision result prunes. Most nodes aren't decisions — every
/// connection (other than a `tools`-port one, which never participates in
/// dependency counting at all) comes back live.
///
/// A node is a decision node if its output carries `active_path`, or both
/// `blocked_outputs` and `decision_result`. For a decision node, each
/// outgoing connection is labeled with `connection.branch` if set, else
/// derived from its `source_port` (a lowercase substring `"true"`/`"false"`),
/// else `"true"`. A connection is pruned if its branch appears in
/// `blocked_outputs`, or if `active_path` is set and differs from the
/// connection's branch.
pub fn split_branches<'a>(
    graph: &'a Graph,
    node_id: &str,
    output: &PortMap,
) -> (Vec<&'a Connection>, Vec<&'a Connection>) {
    let active_path = output.get("active_path").and_then(Value::as_str);
    let is_decision = output.contains_key("active_path")
        || (output.contains_key("blocked_outputs") && output.contains_key("decision_result"));
    let blocked_outputs = output.get("blocked_outputs").and_then(as_string_set);

    let mut live = Vec::new();
    let mut pruned = Vec::new();

    for conn in outgoing(graph, node_id) {
        if conn.target_port == "tools" {
            continue;
        }
        if !is_decision {
            live.push(conn);
            continue;
        }

        let branch = branch_label(conn);
        let blocked = blocked_outputs.as_ref().is_some_and(|blocked| blocked.contains(&branch))
            || active_path.is_some_and(|active| active != branch);

        if blocked {
            pruned.push(conn);
        } else {
            live.push(conn);
        }
    }

    (live, pruned)
}

/// The branch a connection represents for decision-pruning purposes.
fn branch_label(conn: &Connection) -> String {
    if let Some(branch) = &conn.branch {
        return branch.clone();
    }
    let port = conn.source_port.to_lowercase();
    if port.contains("false") {
        "false".to_string()
    } else {
        "true".to_string()
    }
}

fn as_string_set(value: &Value) -> Option<HashSet<String>> {
    value
        .as_array()
        .map(|values| values.iter().filter_map(Value::as_str).map(str::to_string).collect())
}

fn outgoing<'a>(graph: &'a Graph, node_id: &str) -> Vec<&'a Connection> {
    graph
        .downstream(node_id)
        .iter()
        .flat_map(|target| graph.input_connections(target))
        .filter(|c| c.source_node_id == node_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuschia_config::NodeConfig;
    use serde_json::json;
    use std::collections::HashMap;

    fn node(id: &str) -> NodeConfig {
        NodeConfig {
            node_id: id.to_string(),
            node_type: "test".to_string(),
            name: None,
            config: json!({}),
            variable_name: None,
        }
    }

    fn conn(id: &str, to: &str, source_port: &str) -> Connection {
        Connection {
            connection_id: id.to_string(),
            source_node_id: "decision".to_string(),
            source_port: source_port.to_string(),
            target_node_id: to.to_string(),
            target_port: "value".to_string(),
            branch: None,
        }
    }

    #[test]
    fn non_decision_node_keeps_every_connection_live() {
        let nodes: HashMap<String, NodeConfig> =
            ["decision", "a", "b"].iter().map(|id| (id.to_string(), node(id))).collect();
        let connections = vec![conn("c1", "a", "value"), conn("c2", "b", "value")];
        let graph = Graph::new(&nodes, &connections);

        let (live, pruned) = split_branches(&graph, "decision", &PortMap::new());
        assert_eq!(live.len(), 2);
        assert!(pruned.is_empty());
    }

    #[test]
    fn active_path_prunes_non_matching_branches() {
        let nodes: HashMap<String, NodeConfig> = ["decision", "true_path", "false_path"]
            .iter()
            .map(|id| (id.to_string(), node(id)))
            .collect();
        let connections = vec![
            conn("c1", "true_path", "output_true"),
            conn("c2", "false_path", "output_false"),
        ];
        let graph = Graph::new(&nodes, &connections);

        let mut output = PortMap::new();
        output.insert("active_path".to_string(), json!("true"));

        let (live, pruned) = split_branches(&graph, "decision", &output);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].target_node_id, "true_path");
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].target_node_id, "false_path");
    }

    #[test]
    fn blocked_outputs_prunes_named_branches_without_active_path() {
        let nodes: HashMap<String, NodeConfig> = ["decision", "true_path", "false_path"]
            .iter()
            .map(|id| (id.to_string(), node(id)))
            .collect();
        let connections = vec![
            conn("c1", "true_path", "output_true"),
            conn("c2", "false_path", "output_false"),
        ];
        let graph = Graph::new(&nodes, &connections);

        let mut output = PortMap::new();
        output.insert("decision_result".to_string(), json!("false"));
        output.insert("blocked_outputs".to_string(), json!(["true"]));

        let (live, pruned) = split_branches(&graph, "decision", &output);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].target_node_id, "false_path");
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].target_node_id, "true_path");
    }

    #[test]
    fn explicit_branch_tag_overrides_source_port_derivation() {
        let nodes: HashMap<String, NodeConfig> = ["decision", "a"].iter().map(|id| (id.to_string(), node(id))).collect();
        let mut tagged = conn("c1", "a", "out");
        tagged.branch = Some("false".to_string());
        let graph = Graph::new(&nodes, &[tagged]);

        let mut output = PortMap::new();
        output.insert("active_path".to_string(), json!("true"));

        let (live, pruned) = split_branches(&graph, "decision", &output);
        assert!(live.is_empty());
        assert_eq!(pruned.len(), 1);
    }

    #[test]
    fn tools_port_connection_is_never_classified() {
        let nodes: HashMap<String, NodeConfig> =
            ["agent", "tool"].iter().map(|id| (id.to_string(), node(id))).collect();
        let mut tools_conn = conn("c1", "tool", "value");
        tools_conn.source_node_id = "agent".to_string();
        tools_conn.target_node_id = "tool".to_string();
        tools_conn.target_port = "tools".to_string();
        let graph = Graph::new(&nodes, &[tools_conn]);

        let (live, pruned) = split_branches(&graph, "agent", &PortMap::new());
        assert!(live.is_empty());
        assert!(pruned.is_empty());
    }
}
