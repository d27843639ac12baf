use async_trait::async_trait;
use fuschia_context::{ExecutionContext, ExecutionMode, ExecutionStatus};

/// The persistence boundary: an orchestrator is handed one of these and
/// never touches a database itself. A reference in-memory implementation
/// lives under `tests/` for integration coverage; production backends
/// (Postgres, SQLite, whatever a deployment already uses) implement this
/// trait outside this crate.
#[async_trait]
pub trait ExecutionSink: Send + Sync {
    async fn create(&self, workflow_id: &str, execution_id: &str, mode: ExecutionMode) -> Result<(), String>;
    async fn update_status(&self, execution_id: &str, status: ExecutionStatus) -> Result<(), String>;
    async fn update_node_results(&self, execution_id: &str, context: &ExecutionContext) -> Result<(), String>;
}

/// Discards everything. Useful for tests and callers that don't need
/// execution history persisted.
pub struct NoopSink;

#[async_trait]
impl ExecutionSink for NoopSink {
    async fn create(&self, _workflow_id: &str, _execution_id: &str, _mode: ExecutionMode) -> Result<(), String> {
        Ok(())
    }

    async fn update_status(&self, _execution_id: &str, _status: ExecutionStatus) -> Result<(), String> {
        Ok(())
    }

    async fn update_node_results(&self, _execution_id: &str, _context: &ExecutionContext) -> Result<(), String> {
        Ok(())
    }
}
