use std::sync::Arc;

use async_trait::async_trait;
use fuschia_context::{ExecutionContext, ExecutionMode, ExecutionNotifier, NoopNotifier};
use fuschia_node::SharedNodeRegistry;
use fuschia_runtime::{CredentialManager, NoCredentials, Scheduler};
use fuschia_trigger::{ExecutionSpawner, TriggerManager};
use fuschia_workflow::Workflow;
use serde_json::Value;
use tracing::error;
use uuid::Uuid;

use crate::error::OrchestratorError;
use crate::sink::{ExecutionSink, NoopSink};

/// Glues the node registry, scheduler, and trigger manager into the two
/// shapes a caller needs: run a workflow once and wait for the result, or
/// start/stop a workflow's trigger nodes so it runs itself over time.
pub struct Orchestrator {
    registry: SharedNodeRegistry,
    triggers: Arc<TriggerManager>,
    credentials: Arc<dyn CredentialManager>,
    notifier: Arc<dyn ExecutionNotifier>,
    sink: Arc<dyn ExecutionSink>,
}

impl Orchestrator {
    pub fn new(registry: SharedNodeRegistry) -> Arc<Self> {
        Self::with_dependencies(
            registry,
            Arc::new(NoCredentials),
            Arc::new(NoopNotifier),
            Arc::new(NoopSink),
        )
    }

    pub fn with_dependencies(
        registry: SharedNodeRegistry,
        credentials: Arc<dyn CredentialManager>,
        notifier: Arc<dyn ExecutionNotifier>,
        sink: Arc<dyn ExecutionSink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            triggers: Arc::new(TriggerManager::new()),
            credentials,
            notifier,
            sink,
        })
    }

    /// Runs `workflow` once to completion and returns the final execution
    /// context. Used for manual runs and for the CLI's `run workflow`.
    pub async fn execute_workflow(
        self: &Arc<Self>,
        workflow: Arc<Workflow>,
        trigger_data: Option<Value>,
    ) -> Result<ExecutionContext, OrchestratorError> {
        self.execute_workflow_as(workflow, trigger_data, ExecutionMode::Manual).await
    }

    async fn execute_workflow_as(
        self: &Arc<Self>,
        workflow: Arc<Workflow>,
        trigger_data: Option<Value>,
        mode: ExecutionMode,
    ) -> Result<ExecutionContext, OrchestratorError> {
        let execution_id = Uuid::new_v4().to_string();
        self.sink
            .create(&workflow.workflow_id, &execution_id, mode.clone())
            .await
            .map_err(OrchestratorError::Sink)?;

        let scheduler = Scheduler::with_dependencies(
            workflow,
            Arc::clone(&self.registry),
            Arc::clone(&self.credentials),
            Arc::clone(&self.notifier),
            execution_id,
            mode,
            trigger_data,
        );

        let result = scheduler.run().await?;

        self.sink
            .update_status(&result.execution_id, result.status)
            .await
            .map_err(OrchestratorError::Sink)?;
        self.sink
            .update_node_results(&result.execution_id, &result)
            .await
            .map_err(OrchestratorError::Sink)?;

        Ok(result)
    }

    /// Starts `workflow`'s trigger nodes watching for external events. Each
    /// observed event spawns a fresh, independent execution in
    /// `ExecutionMode::Trigger` rather than blocking the trigger node.
    pub async fn start_workflow(self: &Arc<Self>, workflow: Arc<Workflow>) -> Result<(), OrchestratorError> {
        let spawner: Arc<dyn ExecutionSpawner> = Arc::new(WorkflowSpawner {
            orchestrator: Arc::clone(self),
            workflow: Arc::clone(&workflow),
        });
        self.triggers.activate(&workflow, &self.registry, spawner).await?;
        Ok(())
    }

    pub async fn stop_workflow(&self, workflow_id: &str) -> Result<(), OrchestratorError> {
        self.triggers.deactivate(workflow_id).await?;
        Ok(())
    }

    pub async fn is_workflow_running(&self, workflow_id: &str) -> bool {
        self.triggers.is_workflow_active(workflow_id).await
    }
}

struct WorkflowSpawner {
    orchestrator: Arc<Orchestrator>,
    workflow: Arc<Workflow>,
}

#[async_trait]
impl ExecutionSpawner for WorkflowSpawner {
    async fn spawn_execution(&self, _workflow_id: &str, trigger_data: Value) -> Result<(), String> {
        let orchestrator = Arc::clone(&self.orchestrator);
        let workflow = Arc::clone(&self.workflow);
        tokio::spawn(async move {
            if let Err(err) = orchestrator
                .execute_workflow_as(workflow, Some(trigger_data), ExecutionMode::Trigger)
                .await
            {
                error!(error = %err, "triggered workflow execution failed");
            }
        });
        Ok(())
    }
}
