use async_trait::async_trait;
use serde_json::Value;

/// What a trigger node calls into when it observes an external event.
/// Implemented by `fuschia-orchestrator` and injected here so this crate
/// never depends on the scheduler or the persistence layer directly.
#[async_trait]
pub trait ExecutionSpawner: Send + Sync {
    async fn spawn_execution(&self, workflow_id: &str, trigger_data: Value) -> Result<(), String>;
}
