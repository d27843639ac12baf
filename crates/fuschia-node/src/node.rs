use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::NodeError;
use crate::port::{Port, PortMap};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Callback a trigger node uses to hand newly observed external events back
/// to the engine. Each invocation starts one new workflow execution using the
/// trigger data as the initial input; it does not block on that execution
/// finishing.
pub type SpawnCallback =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<(), NodeError>> + Send + Sync>;

/// Callback an Agent-style node uses to run a named tool node without going
/// through the queue as an ordinary dependency-driven step. The callback does
/// not hold any resource-pool permit while the returned future is pending.
pub type NodeRunner =
    Arc<dyn Fn(String, PortMap) -> BoxFuture<'static, Result<PortMap, NodeError>> + Send + Sync>;

/// Everything a `Node::execute` call needs: assembled inputs, resolved
/// config, and identifying context for logging/credential scoping.
#[derive(Clone)]
pub struct NodeExecutionInput {
    pub execution_id: String,
    pub workflow_id: String,
    pub node_id: String,
    pub inputs: PortMap,
    pub config: Value,
    pub node_runner: Option<NodeRunner>,
}

/// The abstract contract every concrete node type implements. Nothing in
/// `fuschia-runtime` ever downcasts a `Node` or inspects its concrete type;
/// all dispatch goes through this trait and the `NodeCapabilities` declared
/// at registration.
#[async_trait]
pub trait Node: Send + Sync {
    fn input_ports(&self) -> &[Port];
    fn output_ports(&self) -> &[Port];

    /// JSON schema describing this node type's config shape. Advisory —
    /// used by tooling outside this crate, never validated by the engine.
    fn config_schema(&self) -> Value {
        Value::Object(Default::default())
    }

    async fn execute(&self, input: NodeExecutionInput) -> Result<PortMap, NodeError>;

    /// Resume a paused human-in-the-loop node with the operator's decision.
    async fn handle_interaction(
        &self,
        _action: &str,
        _form: Value,
        _payload: Value,
    ) -> Result<PortMap, NodeError> {
        Err(NodeError::Unsupported {
            node_type: "handle_interaction",
        })
    }

    /// Begin watching for external events. Only called for nodes whose
    /// declared capabilities include `trigger`.
    async fn start_monitoring(
        &self,
        _workflow_id: &str,
        _spawn: SpawnCallback,
    ) -> Result<(), NodeError> {
        Err(NodeError::Unsupported {
            node_type: "start_monitoring",
        })
    }

    async fn stop_monitoring(&self) -> Result<(), NodeError> {
        Ok(())
    }

    async fn cleanup(&self) {}
}
