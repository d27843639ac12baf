//! The reactive scheduler: resource pools, input assembly, decision-branch
//! and loop control, retry/backoff, credential injection, and the main
//! execution loop that drives a workflow from its entry points to
//! completion (or a pause on human interaction).

mod credentials;
mod decision;
mod error;
mod input;
mod loop_controller;
mod pools;
mod retry;
mod scheduler;

pub use credentials::{build_credential_map, find_credential_refs, CredentialError, CredentialManager, NoCredentials};
pub use decision::split_branches;
pub use error::RuntimeError;
pub use input::assemble_inputs;
pub use loop_controller::{reset_loop_nodes, wants_continue};
pub use pools::{PoolGuard, Pools};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use scheduler::Scheduler;
