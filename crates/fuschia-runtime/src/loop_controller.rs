use std::collections::{HashMap, HashSet};

use fuschia_context::NodeExecutionResult;
use fuschia_node::PortMap;
use fuschia_workflow::{ExecutionGraph, Graph, NodePhase};

/// Whether a node at the closing end of a loop-back edge asked the engine to
/// run another iteration. Absent or non-boolean is treated as "stop".
pub fn wants_continue(output: &PortMap) -> bool {
    output
        .get("continue_loop")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

/// After a loop-closing node asks to continue, every node in its loop body —
/// not just the loop-back edge's immediate target — needs to become eligible
/// to run again: each was left `Completed` by the first iteration, and
/// `ExecutionGraph::decrement_dep` only ever reactivates a `Pending` node, so
/// without this they'd stay stuck. Each body node's `remaining_deps` is reset
/// to its non-loop-back in-degree and its phase recomputed from that, exactly
/// as `ExecutionGraph::new` initializes it for the first iteration.
///
/// Every body node's recorded result is discarded too, except the loop
/// control node's own (identified by a `continue_loop` key in its outputs) —
/// it just asked for another iteration and its own result is what the next
/// pass's input assembly should see until it runs again.
pub fn reset_loop_nodes(
    graph: &Graph,
    execution_graph: &mut ExecutionGraph,
    node_results: &mut HashMap<String, NodeExecutionResult>,
    loop_closing_node: &str,
) -> Vec<String> {
    let mut reset = Vec::new();
    for target in graph.downstream(loop_closing_node) {
        if !graph.is_loop_back(loop_closing_node, target) {
            continue;
        }
        for node in loop_body(graph, target, loop_closing_node) {
            let deps = graph.forward_in_degree(&node);
            execution_graph.set_remaining_deps(&node, deps);
            let phase = if deps == 0 { NodePhase::Ready } else { NodePhase::Pending };
            execution_graph.set_phase(&node, phase);

            let is_loop_control = node_results
                .get(&node)
                .is_some_and(|result| result.outputs.contains_key("continue_loop"));
            if !is_loop_control {
                node_results.remove(&node);
            }

            reset.push(node);
        }
    }
    reset
}

/// Nodes on the path from `target` (the loop-back edge's head) to `closing`
/// (its tail), inclusive of both. Found by walking forward from `target`
/// without expanding past `closing`, so a branch leaving the loop through
/// `closing` toward the rest of the workflow is never swept in.
fn loop_body(graph: &Graph, target: &str, closing: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    let mut stack = vec![target.to_string()];
    while let Some(node) = stack.pop() {
        if !seen.insert(node.clone()) {
            continue;
        }
        order.push(node.clone());
        if node == closing {
            continue;
        }
        for next in graph.downstream(&node) {
            if !seen.contains(next) {
                stack.push(next.clone());
            }
        }
    }
    order
}
