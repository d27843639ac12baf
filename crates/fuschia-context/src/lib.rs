//! Execution-scoped state: the context a running workflow carries, the
//! event bus a scheduler emits to, and the stable variable-key mapping
//! computed once per workflow build.

mod context;
mod events;
mod progress;
mod result;
mod variable_keys;

pub use context::{ExecutionContext, ExecutionMode, ExecutionStatus};
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use progress::ExecutionProgress;
pub use result::NodeExecutionResult;
pub use variable_keys::VariableKeys;
