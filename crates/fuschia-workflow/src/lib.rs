//! Fuschia Workflow
//!
//! The graph model: a validated `Workflow` built from `fuschia_config`'s wire
//! format, its static `Graph` (adjacency, join points, loop-back edges,
//! tool-only nodes), and the per-execution `ExecutionGraph` (node phases,
//! remaining-dependency counts) a scheduler mutates as nodes complete.

mod error;
mod execution_graph;
mod graph;
mod workflow;

pub use error::WorkflowError;
pub use execution_graph::{DepTransition, ExecutionGraph, NodePhase};
pub use graph::Graph;
pub use workflow::Workflow;
