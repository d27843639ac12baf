use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::capabilities::NodeCapabilities;
use crate::node::Node;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no node type registered under key {0:?}")]
    Unknown(String),

    #[error("node type {0:?} is already registered")]
    Duplicate(String),
}

/// Builds a fresh `Node` instance and reports the capabilities it was
/// registered with. One `NodeFactory` is installed per `node_type` key.
pub trait NodeFactory: Send + Sync {
    fn create(&self) -> Box<dyn Node>;
    fn capabilities(&self) -> NodeCapabilities;
}

impl<F> NodeFactory for F
where
    F: Fn() -> Box<dyn Node> + Send + Sync,
{
    fn create(&self) -> Box<dyn Node> {
        (self)()
    }

    fn capabilities(&self) -> NodeCapabilities {
        NodeCapabilities::default()
    }
}

/// Pairs a bare factory closure with an explicit capability set, for
/// registrations that need pools/trigger/human_interaction tags beyond the
/// all-defaults blanket impl above.
pub struct CapabilityFactory<F> {
    factory: F,
    capabilities: NodeCapabilities,
}

impl<F> CapabilityFactory<F>
where
    F: Fn() -> Box<dyn Node> + Send + Sync,
{
    pub fn new(capabilities: NodeCapabilities, factory: F) -> Self {
        Self {
            factory,
            capabilities,
        }
    }
}

impl<F> NodeFactory for CapabilityFactory<F>
where
    F: Fn() -> Box<dyn Node> + Send + Sync,
{
    fn create(&self) -> Box<dyn Node> {
        (self.factory)()
    }

    fn capabilities(&self) -> NodeCapabilities {
        self.capabilities.clone()
    }
}

struct Entry {
    factory: Box<dyn NodeFactory>,
}

/// In-process registry mapping a workflow's `node_type` strings to the
/// factories that build their `Node` instances. Populated once at startup,
/// looked up by key during scheduling — no reflection, no runtime class
/// scanning.
#[derive(Default)]
pub struct NodeRegistry {
    entries: HashMap<String, Entry>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        node_type: impl Into<String>,
        factory: impl NodeFactory + 'static,
    ) -> Result<(), RegistryError> {
        let node_type = node_type.into();
        if self.entries.contains_key(&node_type) {
            return Err(RegistryError::Duplicate(node_type));
        }
        self.entries.insert(
            node_type,
            Entry {
                factory: Box::new(factory),
            },
        );
        Ok(())
    }

    pub fn capabilities(&self, node_type: &str) -> Result<NodeCapabilities, RegistryError> {
        self.entries
            .get(node_type)
            .map(|entry| entry.factory.capabilities())
            .ok_or_else(|| RegistryError::Unknown(node_type.to_string()))
    }

    pub fn create(&self, node_type: &str) -> Result<Box<dyn Node>, RegistryError> {
        self.entries
            .get(node_type)
            .map(|entry| entry.factory.create())
            .ok_or_else(|| RegistryError::Unknown(node_type.to_string()))
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.entries.contains_key(node_type)
    }

    pub fn node_types(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }
}

pub type SharedNodeRegistry = Arc<NodeRegistry>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NodeError;
    use crate::node::NodeExecutionInput;
    use crate::port::{Port, PortMap};
    use async_trait::async_trait;

    struct Echo {
        inputs: Vec<Port>,
        outputs: Vec<Port>,
    }

    #[async_trait]
    impl Node for Echo {
        fn input_ports(&self) -> &[Port] {
            &self.inputs
        }
        fn output_ports(&self) -> &[Port] {
            &self.outputs
        }
        async fn execute(&self, input: NodeExecutionInput) -> Result<PortMap, NodeError> {
            Ok(input.inputs)
        }
    }

    #[test]
    fn register_and_create() {
        let mut registry = NodeRegistry::new();
        registry
            .register("echo", || -> Box<dyn Node> {
                Box::new(Echo {
                    inputs: vec![Port::new("value")],
                    outputs: vec![Port::new("value")],
                })
            })
            .unwrap();

        assert!(registry.contains("echo"));
        assert!(registry.create("echo").is_ok());
        assert!(matches!(
            registry.create("missing"),
            Err(RegistryError::Unknown(_))
        ));
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry = NodeRegistry::new();
        registry
            .register("echo", || -> Box<dyn Node> {
                Box::new(Echo {
                    inputs: vec![],
                    outputs: vec![],
                })
            })
            .unwrap();
        let result = registry.register("echo", || -> Box<dyn Node> {
            Box::new(Echo {
                inputs: vec![],
                outputs: vec![],
            })
        });
        assert!(matches!(result, Err(RegistryError::Duplicate(_))));
    }
}
