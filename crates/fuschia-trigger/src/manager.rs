use std::collections::HashMap;
use std::sync::Arc;

use fuschia_node::{Node, NodeRegistry, SpawnCallback};
use fuschia_workflow::Workflow;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::TriggerError;
use crate::spawner::ExecutionSpawner;

struct ActiveWorkflow {
    nodes: Vec<Box<dyn Node>>,
}

/// Process-wide registry of which workflows currently have their trigger
/// nodes watching for external events. Activation/deactivation of the SAME
/// workflow id is serialized through a per-workflow lock, so two callers
/// racing on that id can't both start (or both stop) its monitors — but
/// unrelated workflows each get their own lock and never wait on each other,
/// even while one's `start_monitoring`/`stop_monitoring` calls are in flight.
#[derive(Default)]
pub struct TriggerManager {
    active: Mutex<HashMap<String, ActiveWorkflow>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TriggerManager {
    pub fn new() -> Self {
        Self::default()
    }

    async fn workflow_lock(&self, workflow_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(
            locks
                .entry(workflow_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Starts monitoring on every trigger-capable node in `workflow`. Fails
    /// (leaving no partial state) if the workflow is already active or any
    /// trigger node's `start_monitoring` call fails.
    pub async fn activate(
        &self,
        workflow: &Workflow,
        registry: &NodeRegistry,
        spawner: Arc<dyn ExecutionSpawner>,
    ) -> Result<(), TriggerError> {
        let lock = self.workflow_lock(&workflow.workflow_id).await;
        let _guard = lock.lock().await;

        if self.active.lock().await.contains_key(&workflow.workflow_id) {
            return Err(TriggerError::AlreadyActive(workflow.workflow_id.clone()));
        }

        let mut started = Vec::new();
        for node_config in workflow.nodes.values() {
            let capabilities = registry.capabilities(&node_config.node_type).map_err(|_| {
                TriggerError::UnknownNodeType {
                    node_id: node_config.node_id.clone(),
                    node_type: node_config.node_type.clone(),
                }
            })?;
            if !capabilities.trigger {
                continue;
            }

            let node = registry.create(&node_config.node_type).map_err(|_| {
                TriggerError::UnknownNodeType {
                    node_id: node_config.node_id.clone(),
                    node_type: node_config.node_type.clone(),
                }
            })?;

            let callback = spawn_callback(workflow.workflow_id.clone(), Arc::clone(&spawner));
            node.start_monitoring(&workflow.workflow_id, callback)
                .await
                .map_err(|err| TriggerError::StartFailed {
                    node_id: node_config.node_id.clone(),
                    message: err.to_string(),
                })?;

            info!(workflow_id = %workflow.workflow_id, node_id = %node_config.node_id, "trigger node monitoring started");
            started.push(node);
        }

        self.active
            .lock()
            .await
            .insert(workflow.workflow_id.clone(), ActiveWorkflow { nodes: started });
        Ok(())
    }

    /// Stops monitoring on every node started by `activate` and forgets the
    /// workflow's active state. `stop_monitoring` failures are logged but do
    /// not prevent the workflow from being marked inactive.
    pub async fn deactivate(&self, workflow_id: &str) -> Result<(), TriggerError> {
        let lock = self.workflow_lock(workflow_id).await;
        let _guard = lock.lock().await;

        let Some(active) = self.active.lock().await.remove(workflow_id) else {
            return Err(TriggerError::NotActive(workflow_id.to_string()));
        };
        for node in active.nodes {
            if let Err(err) = node.stop_monitoring().await {
                warn!(workflow_id, error = %err, "trigger node failed to stop monitoring cleanly");
            }
        }
        Ok(())
    }

    pub async fn is_workflow_active(&self, workflow_id: &str) -> bool {
        self.active.lock().await.contains_key(workflow_id)
    }
}

fn spawn_callback(workflow_id: String, spawner: Arc<dyn ExecutionSpawner>) -> SpawnCallback {
    Arc::new(move |payload| {
        let workflow_id = workflow_id.clone();
        let spawner = Arc::clone(&spawner);
        Box::pin(async move {
            spawner
                .spawn_execution(&workflow_id, payload)
                .await
                .map_err(fuschia_node::NodeError::execution)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fuschia_config::{Connection, NodeConfig, WorkflowDef};
    use fuschia_node::{CapabilityFactory, NodeCapabilities, NodeError, NodeExecutionInput, Port, PortMap};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingTrigger {
        started: Arc<AtomicUsize>,
        stopped: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Node for RecordingTrigger {
        fn input_ports(&self) -> &[Port] {
            &[]
        }
        fn output_ports(&self) -> &[Port] {
            &[]
        }
        async fn execute(&self, _input: NodeExecutionInput) -> Result<PortMap, NodeError> {
            Ok(PortMap::new())
        }
        async fn start_monitoring(&self, _workflow_id: &str, _spawn: SpawnCallback) -> Result<(), NodeError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn stop_monitoring(&self) -> Result<(), NodeError> {
            self.stopped.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct NoopSpawner;

    #[async_trait]
    impl ExecutionSpawner for NoopSpawner {
        async fn spawn_execution(&self, _workflow_id: &str, _trigger_data: Value) -> Result<(), String> {
            Ok(())
        }
    }

    fn workflow_with_one_trigger() -> Workflow {
        let def = WorkflowDef {
            workflow_id: "wf".to_string(),
            name: "wf".to_string(),
            nodes: vec![NodeConfig {
                node_id: "trigger".to_string(),
                node_type: "recording_trigger".to_string(),
                name: None,
                config: json!({}),
                variable_name: None,
            }],
            connections: Vec::<Connection>::new(),
            variables: Default::default(),
            execution_constraints: Default::default(),
        };
        Workflow::from_def(def).unwrap()
    }

    #[tokio::test]
    async fn activate_starts_trigger_nodes_and_deactivate_stops_them() {
        let started = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));

        let mut registry = NodeRegistry::new();
        let started_for_factory = Arc::clone(&started);
        let stopped_for_factory = Arc::clone(&stopped);
        registry
            .register(
                "recording_trigger",
                CapabilityFactory::new(NodeCapabilities::default().triggerable(), move || -> Box<dyn Node> {
                    Box::new(RecordingTrigger {
                        started: Arc::clone(&started_for_factory),
                        stopped: Arc::clone(&stopped_for_factory),
                    })
                }),
            )
            .unwrap();

        let workflow = workflow_with_one_trigger();
        let manager = TriggerManager::new();

        manager.activate(&workflow, &registry, Arc::new(NoopSpawner)).await.unwrap();
        assert!(manager.is_workflow_active(&workflow.workflow_id).await);
        assert_eq!(started.load(Ordering::SeqCst), 1);

        assert!(matches!(
            manager.activate(&workflow, &registry, Arc::new(NoopSpawner)).await,
            Err(TriggerError::AlreadyActive(_))
        ));

        manager.deactivate(&workflow.workflow_id).await.unwrap();
        assert!(!manager.is_workflow_active(&workflow.workflow_id).await);
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
    }
}
