use serde::{Deserialize, Serialize};

/// A snapshot of how far an execution has gotten, attached to every
/// node-level event so a listener never has to reconstruct it by counting.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ExecutionProgress {
    pub total_nodes: usize,
    /// `total_nodes` minus nodes pruned by a decision branch or loop
    /// iteration that never became eligible to run this pass.
    pub effective_total: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub executing: usize,
    pub pending: usize,
}

impl ExecutionProgress {
    pub fn progress_percent(&self) -> f64 {
        if self.effective_total == 0 {
            return 100.0;
        }
        let done = self.completed + self.failed + self.skipped;
        (done as f64 / self.effective_total as f64) * 100.0
    }
}
