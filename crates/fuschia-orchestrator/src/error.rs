use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Runtime(#[from] fuschia_runtime::RuntimeError),

    #[error(transparent)]
    Trigger(#[from] fuschia_trigger::TriggerError),

    #[error("execution sink error: {0}")]
    Sink(String),
}
