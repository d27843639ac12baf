use serde_json::Value;
use tokio::sync::mpsc;

use crate::progress::ExecutionProgress;

/// Every observable thing that happens during an execution. Node-level
/// variants carry a progress snapshot so a listener never has to
/// reconstruct it by counting completions itself.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    WorkflowStarted {
        execution_id: String,
    },
    NodeStarted {
        node_id: String,
        progress: ExecutionProgress,
    },
    NodeCompleted {
        node_id: String,
        data: Value,
        progress: ExecutionProgress,
    },
    NodeFailed {
        node_id: String,
        error: String,
        progress: ExecutionProgress,
    },
    NodeStopped {
        node_id: String,
        progress: ExecutionProgress,
    },
    InteractionRequired {
        node_id: String,
        form: Value,
    },
    ExecutionPaused {
        node_id: String,
    },
    ExecutionResumed {
        node_id: String,
    },
    WorkflowCompleted {
        progress: ExecutionProgress,
    },
    WorkflowFailed {
        error: String,
    },
}

/// Sink for execution events. Implementors must not block the scheduler —
/// `notify` is called from inside the scheduler loop between node
/// dispatches.
pub trait ExecutionNotifier: Send + Sync {
    fn notify(&self, event: ExecutionEvent);
}

/// Discards every event. The default notifier when nothing downstream is
/// listening.
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
    fn notify(&self, _event: ExecutionEvent) {}
}

/// Forwards every event over an unbounded channel. Unbounded because a
/// notifier that blocks the scheduler on backpressure would stall node
/// dispatch; callers that care about memory must drain the receiver
/// promptly instead.
pub struct ChannelNotifier(pub mpsc::UnboundedSender<ExecutionEvent>);

impl ExecutionNotifier for ChannelNotifier {
    fn notify(&self, event: ExecutionEvent) {
        // A closed receiver just means nobody is listening anymore; dropping
        // the event is the right behavior, not an error.
        let _ = self.0.send(event);
    }
}
