use std::collections::HashMap;

use fuschia_config::NodeConfig;
use fuschia_context::NodeExecutionResult;
use fuschia_node::PortMap;
use fuschia_workflow::Graph;
use serde_json::{json, Value};

/// Assembles one node's input `PortMap` from its upstream connections, the
/// results already recorded for those upstream nodes, and the execution's
/// trigger data. A target port fed by exactly one connection gets that
/// connection's value directly; a target port fed by more than one
/// connection (a join, or a tools list) gets the values collected into an
/// array in connection-definition order.
///
/// A connection into the `tools` port is special: it carries the source
/// node's own config (a tool descriptor an Agent can later hand to its node
/// runner callback), not whatever that node's output happens to be — the
/// source node is typically never auto-executed at all.
pub fn assemble_inputs(
    graph: &Graph,
    nodes: &HashMap<String, NodeConfig>,
    node_results: &HashMap<String, NodeExecutionResult>,
    variables: &HashMap<String, Value>,
    node_id: &str,
) -> PortMap {
    let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();

    for conn in graph.input_connections(node_id) {
        let value = if conn.target_port == "tools" {
            let Some(source) = nodes.get(&conn.source_node_id) else {
                continue;
            };
            tool_descriptor(source)
        } else {
            let Some(result) = node_results.get(&conn.source_node_id) else {
                continue;
            };
            result.outputs.get(&conn.source_port).cloned().unwrap_or(Value::Null)
        };
        grouped.entry(conn.target_port.clone()).or_default().push(value);
    }

    let mut inputs: PortMap = grouped
        .into_iter()
        .map(|(port, mut values)| {
            let value = if values.len() == 1 {
                values.pop().unwrap()
            } else {
                Value::Array(values)
            };
            (port, value)
        })
        .collect();

    if let Some(trigger_data) = variables.get("trigger_data") {
        let input_is_empty = matches!(inputs.get("input"), None | Some(Value::Null));
        if input_is_empty {
            inputs.insert("input".to_string(), trigger_data.clone());
        } else {
            inputs.insert("_trigger_data".to_string(), trigger_data.clone());
        }
    }

    inputs
}

fn tool_descriptor(source: &NodeConfig) -> Value {
    json!({
        "node_id": source.node_id,
        "node_type": source.node_type,
        "config": source.config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fuschia_config::Connection;
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

    fn conn(id: &str, from: &str, from_port: &str, to: &str, to_port: &str) -> Connection {
        Connection {
            connection_id: id.to_string(),
            source_node_id: from.to_string(),
            source_port: from_port.to_string(),
            target_node_id: to.to_string(),
            target_port: to_port.to_string(),
            branch: None,
        }
    }

    fn result_with(port: &str, value: Value) -> NodeExecutionResult {
        let mut r = NodeExecutionResult::running(Utc::now());
        r.outputs.insert(port.to_string(), value);
        r.success = true;
        r
    }

    #[test]
    fn single_upstream_passes_value_through() {
        let nodes: HashMap<String, NodeConfig> =
            ["a", "b"].iter().map(|id| (id.to_string(), node(id))).collect();
        let connections = vec![conn("c1", "a", "value", "b", "value")];
        let graph = Graph::new(&nodes, &connections);

        let mut results = HashMap::new();
        results.insert("a".to_string(), result_with("value", json!(42)));

        let inputs = assemble_inputs(&graph, &nodes, &results, &HashMap::new(), "b");
        assert_eq!(inputs.get("value"), Some(&json!(42)));
    }

    #[test]
    fn join_collects_values_into_array() {
        let nodes: HashMap<String, NodeConfig> =
            ["a", "b", "c"].iter().map(|id| (id.to_string(), node(id))).collect();
        let connections = vec![
            conn("c1", "a", "value", "c", "items"),
            conn("c2", "b", "value", "c", "items"),
        ];
        let graph = Graph::new(&nodes, &connections);

        let mut results = HashMap::new();
        results.insert("a".to_string(), result_with("value", json!(1)));
        results.insert("b".to_string(), result_with("value", json!(2)));

        let inputs = assemble_inputs(&graph, &nodes, &results, &HashMap::new(), "c");
        assert_eq!(inputs.get("items"), Some(&json!([1, 2])));
    }

    #[test]
    fn missing_upstream_result_is_skipped() {
        let nodes: HashMap<String, NodeConfig> =
            ["a", "b"].iter().map(|id| (id.to_string(), node(id))).collect();
        let connections = vec![conn("c1", "a", "value", "b", "value")];
        let graph = Graph::new(&nodes, &connections);

        let inputs = assemble_inputs(&graph, &nodes, &HashMap::new(), &HashMap::new(), "b");
        assert!(inputs.is_empty());
    }

    #[test]
    fn tools_port_carries_source_config_not_output() {
        let mut tool_node = node("tool");
        tool_node.config = json!({"name": "search"});
        let nodes: HashMap<String, NodeConfig> =
            [("agent".to_string(), node("agent")), ("tool".to_string(), tool_node)].into_iter().collect();
        let connections = vec![conn("c1", "tool", "value", "agent", "tools")];
        let graph = Graph::new(&nodes, &connections);

        // No result recorded for "tool" at all — it never auto-executes.
        let inputs = assemble_inputs(&graph, &nodes, &HashMap::new(), &HashMap::new(), "agent");
        let tools = inputs.get("tools").unwrap();
        assert_eq!(tools["node_id"], json!("tool"));
        assert_eq!(tools["config"], json!({"name": "search"}));
    }

    #[test]
    fn trigger_data_fills_empty_input_port() {
        let nodes: HashMap<String, NodeConfig> = [("a".to_string(), node("a"))].into_iter().collect();
        let graph = Graph::new(&nodes, &[]);
        let mut variables = HashMap::new();
        variables.insert("trigger_data".to_string(), json!({"x": 1}));

        let inputs = assemble_inputs(&graph, &nodes, &HashMap::new(), &variables, "a");
        assert_eq!(inputs.get("input"), Some(&json!({"x": 1})));
    }

    #[test]
    fn trigger_data_moves_aside_when_input_already_connected() {
        let nodes: HashMap<String, NodeConfig> =
            ["a", "b"].iter().map(|id| (id.to_string(), node(id))).collect();
        let connections = vec![conn("c1", "a", "value", "b", "input")];
        let graph = Graph::new(&nodes, &connections);

        let mut results = HashMap::new();
        results.insert("a".to_string(), result_with("value", json!("connected")));
        let mut variables = HashMap::new();
        variables.insert("trigger_data".to_string(), json!({"x": 1}));

        let inputs = assemble_inputs(&graph, &nodes, &results, &variables, "b");
        assert_eq!(inputs.get("input"), Some(&json!("connected")));
        assert_eq!(inputs.get("_trigger_data"), Some(&json!({"x": 1})));
    }
}
