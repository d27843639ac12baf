use serde::{Deserialize, Serialize};

/// The advisory data type carried on a port. Never enforced by the engine —
/// concrete `Node` impls may use it for their own validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortType {
    Any,
    String,
    Number,
    Boolean,
    Object,
    Array,
}

/// A single named input or output slot declared by a node type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    #[serde(default = "default_port_type")]
    pub port_type: PortType,
    #[serde(default)]
    pub required: bool,
}

fn default_port_type() -> PortType {
    PortType::Any
}

impl Port {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            port_type: PortType::Any,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_type(mut self, port_type: PortType) -> Self {
        self.port_type = port_type;
        self
    }
}

/// Output map keyed by port name, used both as a node's execution output and
/// as the assembled input handed to `Node::execute`.
pub type PortMap = std::collections::HashMap<String, serde_json::Value>;
