//! Serializable workflow wire format.
//!
//! Configuration can be loaded from:
//! - JSON files (via CLI with `--workflow=workflow.json`)
//! - Database storage (as JSON blobs)
//!
//! These types represent a workflow definition before it is loaded into a
//! `fuschia_workflow::Workflow` and resolved against variables/credentials
//! for execution.

mod error;
mod execution;
mod template;
mod workflow;

pub use error::TemplateError;
pub use execution::ExecutionConfig;
pub use template::{resolve_node_config, CredentialMap, Variables};
pub use workflow::{Connection, NodeConfig, WorkflowDef};
