use serde::{Deserialize, Serialize};

/// The resource pools a node execution can draw from. Acquisition order is
/// fixed lexicographically (`Ai < Llm < Standard`) so concurrent node
/// executions never deadlock acquiring more than one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pool {
    Ai,
    Llm,
    Standard,
}

impl Pool {
    pub const ALL: [Pool; 3] = [Pool::Ai, Pool::Llm, Pool::Standard];
}

/// Declared once per node type at registration time, replacing the source's
/// `isinstance(node, LLMCapability)` duck typing with an explicit, inspectable
/// tag set.
#[derive(Debug, Clone, Default)]
pub struct NodeCapabilities {
    pub pools: Vec<Pool>,
    pub trigger: bool,
    pub human_interaction: bool,
}

impl NodeCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool(mut self, pool: Pool) -> Self {
        self.pools.push(pool);
        self
    }

    pub fn triggerable(mut self) -> Self {
        self.trigger = true;
        self
    }

    pub fn interactive(mut self) -> Self {
        self.human_interaction = true;
        self
    }

    /// Pools to acquire, sorted into the fixed deadlock-avoiding order.
    pub fn ordered_pools(&self) -> Vec<Pool> {
        let mut pools = self.pools.clone();
        pools.sort();
        pools.dedup();
        pools
    }
}
