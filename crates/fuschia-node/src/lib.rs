//! The abstract node contract: the trait every concrete node type implements,
//! its capability tags, and the in-process registry that maps a workflow's
//! `node_type` strings to factories. Nothing outside `fuschia-node` knows
//! what a concrete node does internally.

mod capabilities;
mod error;
mod node;
mod port;
mod registry;

pub use capabilities::{NodeCapabilities, Pool};
pub use error::NodeError;
pub use node::{Node, NodeExecutionInput, NodeRunner, SpawnCallback};
pub use port::{Port, PortMap, PortType};
pub use registry::{CapabilityFactory, NodeFactory, NodeRegistry, RegistryError, SharedNodeRegistry};
