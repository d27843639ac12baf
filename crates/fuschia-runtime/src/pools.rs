use std::collections::HashMap;
use std::sync::Arc;

use fuschia_config::ExecutionConfig;
use fuschia_node::Pool;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// One bounded-concurrency semaphore per resource pool. `ai`/`llm` are
/// sized from `ExecutionConfig::ai_concurrent_limit`; `standard` from
/// `max_concurrent_nodes`, matching spec defaults (1, 1, 5).
pub struct Pools {
    semaphores: HashMap<Pool, Arc<Semaphore>>,
}

impl Pools {
    pub fn new(config: &ExecutionConfig) -> Self {
        let mut semaphores = HashMap::new();
        semaphores.insert(Pool::Ai, Arc::new(Semaphore::new(config.ai_concurrent_limit)));
        semaphores.insert(Pool::Llm, Arc::new(Semaphore::new(config.ai_concurrent_limit)));
        semaphores.insert(
            Pool::Standard,
            Arc::new(Semaphore::new(config.max_concurrent_nodes)),
        );
        Self { semaphores }
    }

    /// Acquires permits for every requested pool in the fixed
    /// `Ai < Llm < Standard` order (the caller is expected to have already
    /// sorted/deduped via `NodeCapabilities::ordered_pools`), so two node
    /// executions that both need two pools never acquire them in opposite
    /// orders and deadlock.
    pub async fn acquire(&self, pools: &[Pool]) -> PoolGuard {
        let mut permits = Vec::with_capacity(pools.len());
        for pool in pools {
            let semaphore = self
                .semaphores
                .get(pool)
                .cloned()
                .expect("every Pool variant has a semaphore");
            let permit = semaphore
                .acquire_owned()
                .await
                .expect("pool semaphore is never closed");
            permits.push(permit);
        }
        PoolGuard { _permits: permits }
    }
}

/// Holds acquired permits; dropping it releases them, in reverse acquisition
/// order as `OwnedSemaphorePermit`'s `Drop` does automatically.
pub struct PoolGuard {
    _permits: Vec<OwnedSemaphorePermit>,
}
