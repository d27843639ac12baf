//! End-to-end coverage for `Orchestrator`: a one-shot run through
//! `execute_workflow` with a real sink recording the lifecycle, and
//! start/stop of a trigger-capable workflow driving a fresh execution per
//! firing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fuschia_config::{Connection, NodeConfig, WorkflowDef};
use fuschia_context::{ExecutionContext, ExecutionMode, ExecutionStatus, NoopNotifier};
use fuschia_node::{
    CapabilityFactory, Node, NodeCapabilities, NodeError, NodeExecutionInput, NodeRegistry, Port, PortMap, SpawnCallback,
};
use fuschia_orchestrator::{ExecutionSink, Orchestrator};
use fuschia_runtime::NoCredentials;
use fuschia_workflow::Workflow;
use serde_json::{json, Value};

struct Echo;

#[async_trait]
impl Node for Echo {
    fn input_ports(&self) -> &[Port] {
        &[]
    }
    fn output_ports(&self) -> &[Port] {
        &[]
    }
    async fn execute(&self, input: NodeExecutionInput) -> Result<PortMap, NodeError> {
        Ok(input.inputs)
    }
}

fn node_config(id: &str, node_type: &str) -> NodeConfig {
    NodeConfig {
        node_id: id.to_string(),
        node_type: node_type.to_string(),
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

#[derive(Default)]
struct RecordingSink {
    creates: Mutex<Vec<(String, String, ExecutionMode)>>,
    statuses: Mutex<Vec<(String, ExecutionStatus)>>,
}

#[async_trait]
impl ExecutionSink for RecordingSink {
    async fn create(&self, workflow_id: &str, execution_id: &str, mode: ExecutionMode) -> Result<(), String> {
        self.creates
            .lock()
            .unwrap()
            .push((workflow_id.to_string(), execution_id.to_string(), mode));
        Ok(())
    }

    async fn update_status(&self, execution_id: &str, status: ExecutionStatus) -> Result<(), String> {
        self.statuses.lock().unwrap().push((execution_id.to_string(), status));
        Ok(())
    }

    async fn update_node_results(&self, _execution_id: &str, _context: &ExecutionContext) -> Result<(), String> {
        Ok(())
    }
}

#[tokio::test]
async fn execute_workflow_runs_to_completion_and_updates_sink() {
    let mut registry = NodeRegistry::new();
    registry.register("echo", || -> Box<dyn Node> { Box::new(Echo) }).unwrap();

    let def = WorkflowDef {
        workflow_id: "wf-once".to_string(),
        name: "wf-once".to_string(),
        nodes: vec![node_config("a", "echo"), node_config("b", "echo")],
        connections: vec![conn("c1", "a", "b")],
        variables: Default::default(),
        execution_constraints: Default::default(),
    };
    let workflow = Arc::new(Workflow::from_def(def).unwrap());

    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Orchestrator::with_dependencies(
        Arc::new(registry),
        Arc::new(NoCredentials),
        Arc::new(NoopNotifier),
        Arc::clone(&sink) as Arc<dyn ExecutionSink>,
    );

    let result = orchestrator.execute_workflow(workflow, Some(json!({"x": 1}))).await.unwrap();
    assert_eq!(result.status, ExecutionStatus::Completed);
    assert!(result.node_results.contains_key("a"));
    assert!(result.node_results.contains_key("b"));

    let creates = sink.creates.lock().unwrap();
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].0, "wf-once");
    assert_eq!(creates[0].2, ExecutionMode::Manual);

    let statuses = sink.statuses.lock().unwrap();
    assert_eq!(statuses.last().unwrap().1, ExecutionStatus::Completed);
}

struct FiringTrigger {
    fired: Arc<AtomicUsize>,
}

#[async_trait]
impl Node for FiringTrigger {
    fn input_ports(&self) -> &[Port] {
        &[]
    }
    fn output_ports(&self) -> &[Port] {
        &[]
    }
    async fn execute(&self, _input: NodeExecutionInput) -> Result<PortMap, NodeError> {
        Ok(PortMap::new())
    }

    async fn start_monitoring(&self, _workflow_id: &str, spawn: SpawnCallback) -> Result<(), NodeError> {
        self.fired.fetch_add(1, Ordering::SeqCst);
        spawn(json!({"fired": true})).await?;
        Ok(())
    }

    async fn stop_monitoring(&self) -> Result<(), NodeError> {
        Ok(())
    }
}

#[tokio::test]
async fn start_workflow_spawns_an_execution_per_firing_then_stop_deactivates() {
    let fired = Arc::new(AtomicUsize::new(0));
    let fired_for_factory = Arc::clone(&fired);

    let mut registry = NodeRegistry::new();
    registry
        .register(
            "firing_trigger",
            CapabilityFactory::new(NodeCapabilities::default().triggerable(), move || -> Box<dyn Node> {
                Box::new(FiringTrigger {
                    fired: Arc::clone(&fired_for_factory),
                })
            }),
        )
        .unwrap();

    let def = WorkflowDef {
        workflow_id: "wf-triggered".to_string(),
        name: "wf-triggered".to_string(),
        nodes: vec![node_config("trigger", "firing_trigger")],
        connections: Vec::<Connection>::new(),
        variables: Default::default(),
        execution_constraints: Default::default(),
    };
    let workflow = Arc::new(Workflow::from_def(def).unwrap());

    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Orchestrator::with_dependencies(
        Arc::new(registry),
        Arc::new(NoCredentials),
        Arc::new(NoopNotifier),
        Arc::clone(&sink) as Arc<dyn ExecutionSink>,
    );

    orchestrator.start_workflow(Arc::clone(&workflow)).await.unwrap();
    assert!(orchestrator.is_workflow_running(&workflow.workflow_id).await);
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // The trigger's spawned execution runs on its own tokio task; poll the
    // sink until it shows up rather than assuming a fixed number of yields.
    for _ in 0..50 {
        if !sink.creates.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let creates = sink.creates.lock().unwrap();
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].2, ExecutionMode::Trigger);
    drop(creates);

    orchestrator.stop_workflow(&workflow.workflow_id).await.unwrap();
    assert!(!orchestrator.is_workflow_running(&workflow.workflow_id).await);
}

#[tokio::test]
async fn stop_unstarted_workflow_fails() {
    let registry = NodeRegistry::new();
    let orchestrator = Orchestrator::new(Arc::new(registry));
    assert!(orchestrator.stop_workflow("never-started").await.is_err());
}
