use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use fuschia_config::{resolve_node_config, CredentialMap};
use fuschia_context::{
    ExecutionContext, ExecutionEvent, ExecutionMode, ExecutionNotifier, ExecutionProgress,
    ExecutionStatus, NodeExecutionResult, NoopNotifier, VariableKeys,
};
use fuschia_node::{NodeExecutionInput, NodeRunner, PortMap, SharedNodeRegistry};
use fuschia_workflow::{DepTransition, ExecutionGraph, Graph, NodePhase, Workflow};
use serde_json::Value;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::credentials::{build_credential_map, CredentialManager, NoCredentials};
use crate::decision::split_branches;
use crate::error::RuntimeError;
use crate::input::assemble_inputs;
use crate::loop_controller;
use crate::pools::Pools;
use crate::retry::{retry_with_backoff, RetryPolicy};

struct SchedulerState {
    graph: ExecutionGraph,
    context: ExecutionContext,
    variable_keys: VariableKeys,
}

/// Drives one workflow execution to completion: finds ready nodes, dispatches
/// them concurrently under the resource pools, folds their results back into
/// the graph and context, and resolves decision branches / loop iterations
/// as they complete. One `Scheduler` exists per execution.
pub struct Scheduler {
    workflow: Arc<Workflow>,
    registry: SharedNodeRegistry,
    credentials: Arc<dyn CredentialManager>,
    notifier: Arc<dyn ExecutionNotifier>,
    pools: Arc<Pools>,
    retry_policy: RetryPolicy,
    state: Mutex<SchedulerState>,
    pause: Notify,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(
        workflow: Arc<Workflow>,
        registry: SharedNodeRegistry,
        execution_id: String,
        mode: ExecutionMode,
        trigger_data: Option<Value>,
    ) -> Arc<Self> {
        Self::with_dependencies(
            workflow,
            registry,
            Arc::new(NoCredentials),
            Arc::new(NoopNotifier),
            execution_id,
            mode,
            trigger_data,
        )
    }

    pub fn with_dependencies(
        workflow: Arc<Workflow>,
        registry: SharedNodeRegistry,
        credentials: Arc<dyn CredentialManager>,
        notifier: Arc<dyn ExecutionNotifier>,
        execution_id: String,
        mode: ExecutionMode,
        trigger_data: Option<Value>,
    ) -> Arc<Self> {
        let mut variables = workflow.variables.clone();
        if let Some(data) = trigger_data {
            variables.insert("trigger_data".to_string(), data);
        }

        let graph = ExecutionGraph::new(&workflow);
        let context = ExecutionContext::new(execution_id, workflow.workflow_id.clone(), mode, variables);
        let variable_keys = VariableKeys::build(
            workflow
                .nodes
                .values()
                .map(|n| (n.node_id.as_str(), n.name.as_deref().unwrap_or(n.node_id.as_str()))),
        );

        let pools = Arc::new(Pools::new(&workflow.execution_constraints));
        let retry_policy = RetryPolicy::from(&workflow.execution_constraints);

        Arc::new(Self {
            workflow,
            registry,
            credentials,
            notifier,
            pools,
            retry_policy,
            state: Mutex::new(SchedulerState {
                graph,
                context,
                variable_keys,
            }),
            pause: Notify::new(),
            cancel: CancellationToken::new(),
        })
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the reactive ready/active loop until nothing more can run:
    /// every node is terminal, or the only outstanding nodes are paused
    /// awaiting human interaction.
    pub async fn run(self: &Arc<Self>) -> Result<ExecutionContext, RuntimeError> {
        let execution_id = {
            let mut state = self.state.lock().await;
            state.context.status = ExecutionStatus::Running;
            state.context.execution_id.clone()
        };
        info!(execution_id, "workflow execution starting");
        self.notifier.notify(ExecutionEvent::WorkflowStarted { execution_id });

        let workflow_timeout = std::time::Duration::from_secs(self.workflow.execution_constraints.workflow_timeout_secs);
        let deadline = tokio::time::sleep(workflow_timeout);
        tokio::pin!(deadline);

        loop {
            let ready = {
                let state = self.state.lock().await;
                state.graph.ready_nodes()
            };

            if ready.is_empty() {
                if self.is_done().await {
                    break;
                }
                // Nothing ready and not done: either paused on an
                // interaction or genuinely stuck. Either way, wait for a
                // signal instead of busy-looping.
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = &mut deadline => { self.timeout().await; break; }
                    _ = self.pause.notified() => continue,
                }
            }

            let handles: Vec<_> = ready
                .into_iter()
                .map(|node_id| {
                    let scheduler = Arc::clone(self);
                    tokio::spawn(async move { scheduler.execute_node(node_id).await })
                })
                .collect();

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = &mut deadline => { self.timeout().await; break; }
                _ = futures::future::join_all(handles) => {}
            }
        }

        let mut state = self.state.lock().await;
        let failed_hard = !state.graph.failed().is_empty() && self.workflow.execution_constraints.stop_on_error;
        state.context.status = if failed_hard {
            ExecutionStatus::Failed
        } else if self.cancel.is_cancelled() {
            ExecutionStatus::Stopped
        } else {
            ExecutionStatus::Completed
        };
        state.context.completed_at = Some(Utc::now());
        let progress = self.progress(&state.graph).await;
        drop(state);

        if failed_hard {
            self.notifier.notify(ExecutionEvent::WorkflowFailed {
                error: "one or more nodes failed".to_string(),
            });
        } else {
            self.notifier.notify(ExecutionEvent::WorkflowCompleted { progress });
        }

        let state = self.state.lock().await;
        Ok(state.context.clone())
    }

    /// Nothing left that can ever become ready. A node `AwaitingInteraction`
    /// is not terminal — the run loop instead parks on `pause.notified()`
    /// until `resume_interaction` fires or the execution is cancelled.
    async fn is_done(&self) -> bool {
        let state = self.state.lock().await;
        state.graph.outstanding().is_empty()
    }

    async fn timeout(&self) {
        self.cancel.cancel();
        let mut state = self.state.lock().await;
        state.context.errors.push("workflow execution timed out".to_string());
    }

    async fn execution_id(&self) -> String {
        self.state.lock().await.context.execution_id.clone()
    }

    async fn progress(&self, graph: &ExecutionGraph) -> ExecutionProgress {
        let total = self.workflow.nodes.len();
        let completed = graph.completed().len();
        let failed = graph.failed().len();
        let skipped = graph.skipped().len();
        ExecutionProgress {
            total_nodes: total,
            effective_total: total.saturating_sub(skipped),
            completed,
            failed,
            skipped,
            executing: 0,
            pending: total.saturating_sub(completed + failed + skipped),
        }
    }

    /// The full single-node execution sequence: acquire pools, assemble
    /// inputs, resolve config, inject credentials, run with retry, fold the
    /// result back into the graph, resolve decision branches / loop
    /// continuation, and fan out readiness to dependents.
    #[instrument(skip(self), fields(node_id = %node_id))]
    async fn execute_node(self: Arc<Self>, node_id: String) {
        {
            let mut state = self.state.lock().await;
            state.graph.set_phase(&node_id, NodePhase::Executing);
        }
        let progress = {
            let state = self.state.lock().await;
            self.progress(&state.graph).await
        };
        self.notifier.notify(ExecutionEvent::NodeStarted {
            node_id: node_id.clone(),
            progress,
        });

        let Some(node_config) = self.workflow.get_node(&node_id).cloned() else {
            warn!(node_id, "scheduled node not found in workflow");
            return;
        };

        let Ok(capabilities) = self.registry.capabilities(&node_config.node_type) else {
            self.fail_node(&node_id, format!("unknown node type {}", node_config.node_type)).await;
            return;
        };

        let _permit = self.pools.acquire(&capabilities.ordered_pools()).await;
        let started_at = Utc::now();

        let inputs = {
            let state = self.state.lock().await;
            assemble_inputs(
                self.workflow.graph(),
                &self.workflow.nodes,
                &state.context.node_results,
                &state.context.variables,
                &node_id,
            )
        };

        let credential_map = match build_credential_map(&node_config.config, self.credentials.as_ref()).await {
            Ok(map) => map,
            Err(err) => {
                self.fail_node(&node_id, format!("credential resolution failed: {err}")).await;
                return;
            }
        };

        let resolved_config = {
            let state = self.state.lock().await;
            resolve_node_config(&node_config.config, &state.context.variables, &credential_map)
        };
        let resolved_config = match resolved_config {
            Ok(config) => config,
            Err(err) => {
                self.fail_node(&node_id, format!("config template resolution failed: {err}")).await;
                return;
            }
        };

        let execution_id = self.execution_id().await;
        let workflow_id = self.workflow.workflow_id.clone();
        let registry = Arc::clone(&self.registry);
        let node_type = node_config.node_type.clone();
        let retry_label = node_id.clone();
        let node_runner = self.node_runner();
        let timeout = std::time::Duration::from_secs(self.workflow.execution_constraints.default_timeout_secs);

        let outcome = retry_with_backoff(self.retry_policy, &retry_label, move || {
            let registry = Arc::clone(&registry);
            let node_type = node_type.clone();
            let node_id = node_id.clone();
            let execution_id = execution_id.clone();
            let workflow_id = workflow_id.clone();
            let inputs = inputs.clone();
            let config = resolved_config.clone();
            let node_runner = Arc::clone(&node_runner);
            async move {
                let node = registry.create(&node_type).map_err(|err| {
                    fuschia_node::NodeError::execution(format!("registry lookup failed: {err}"))
                })?;
                let input = NodeExecutionInput {
                    execution_id,
                    workflow_id,
                    node_id,
                    inputs,
                    config,
                    node_runner: Some(node_runner),
                };
                let outputs = match tokio::time::timeout(timeout, node.execute(input)).await {
                    Ok(result) => result?,
                    Err(_) => {
                        return Err(fuschia_node::NodeError::Timeout {
                            timeout_ms: timeout.as_millis() as u64,
                        })
                    }
                };
                match soft_error_message(&outputs) {
                    Some(message) => Err(fuschia_node::NodeError::SoftError { outputs, message }),
                    None => Ok(outputs),
                }
            }
        })
        .await;

        match outcome {
            Ok(outputs) if awaits_human_input(&outputs) => {
                let form = Value::Object(outputs.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
                self.pause_for_interaction(&node_config.node_id, form).await;
            }
            Ok(outputs) => self.complete_node(&node_config.node_id, outputs, started_at, &credential_map).await,
            Err(fuschia_node::NodeError::SoftError { outputs, message }) => {
                self.fail_node_with_outputs(&node_config.node_id, message, Some(outputs)).await
            }
            Err(err) => self.fail_node_with_outputs(&node_config.node_id, err.to_string(), None).await,
        }
    }

    /// The callback an Agent node uses to run another node directly, on
    /// demand, instead of waiting for the scheduler's dependency-driven
    /// queue. Acquires the target's own pool permits independently of
    /// whatever permit the calling Agent is holding, so an Agent occupying
    /// the `ai` pool can still invoke a `standard`-pool tool without
    /// deadlocking against itself.
    fn node_runner(self: &Arc<Self>) -> NodeRunner {
        let scheduler = Arc::clone(self);
        Arc::new(move |target_node_id: String, inputs: PortMap| {
            let scheduler = Arc::clone(&scheduler);
            Box::pin(async move { scheduler.run_tool_node(target_node_id, inputs).await })
        })
    }

    async fn run_tool_node(self: Arc<Self>, node_id: String, inputs: PortMap) -> Result<PortMap, fuschia_node::NodeError> {
        let node_config = self
            .workflow
            .get_node(&node_id)
            .cloned()
            .ok_or_else(|| fuschia_node::NodeError::execution(format!("unknown node {node_id}")))?;

        let capabilities = self.registry.capabilities(&node_config.node_type).map_err(|err| {
            fuschia_node::NodeError::execution(format!("unknown node type {}: {err}", node_config.node_type))
        })?;

        let _permit = self.pools.acquire(&capabilities.ordered_pools()).await;
        let started_at = Utc::now();

        let credential_map = build_credential_map(&node_config.config, self.credentials.as_ref())
            .await
            .map_err(|err| fuschia_node::NodeError::execution(format!("credential resolution failed: {err}")))?;

        let resolved_config = {
            let state = self.state.lock().await;
            resolve_node_config(&node_config.config, &state.context.variables, &credential_map)
        }
        .map_err(|err| fuschia_node::NodeError::execution(format!("config template resolution failed: {err}")))?;

        let node = self
            .registry
            .create(&node_config.node_type)
            .map_err(|err| fuschia_node::NodeError::execution(format!("registry lookup failed: {err}")))?;

        let input = NodeExecutionInput {
            execution_id: self.execution_id().await,
            workflow_id: self.workflow.workflow_id.clone(),
            node_id: node_id.clone(),
            inputs,
            config: resolved_config,
            node_runner: Some(self.node_runner()),
        };

        let timeout = std::time::Duration::from_secs(self.workflow.execution_constraints.default_timeout_secs);
        let outputs = match tokio::time::timeout(timeout, node.execute(input)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(fuschia_node::NodeError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        };

        self.complete_node(&node_id, outputs.clone(), started_at, &credential_map).await;
        Ok(outputs)
    }

    async fn complete_node(
        &self,
        node_id: &str,
        outputs: PortMap,
        started_at: chrono::DateTime<Utc>,
        _credential_map: &CredentialMap,
    ) {
        let output_value = Value::Object(outputs.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
        let mut result = NodeExecutionResult::running(started_at);
        result.success = true;
        result.outputs = outputs.clone();
        result.completed_at = Some(Utc::now());

        let mut state = self.state.lock().await;
        state.graph.set_phase(node_id, NodePhase::Completed);
        let variable_key = state.variable_keys.get(node_id).map(|s| s.to_string());
        let explicit_name = self.workflow.get_node(node_id).and_then(|n| n.variable_name.clone());
        state.context.record_result(node_id, result);
        if let Some(key) = &variable_key {
            state
                .context
                .publish_variables(key, explicit_name.as_deref(), &output_value);
        }

        let (live, pruned) = split_branches(self.workflow.graph(), node_id, &outputs);
        for conn in live {
            state.graph.decrement_dep(&conn.target_node_id, true);
        }
        for conn in pruned {
            let transition = state.graph.decrement_dep(&conn.target_node_id, false);
            if transition == DepTransition::Skipped {
                cascade_skip(self.workflow.graph(), &mut state.graph, &conn.target_node_id);
            }
        }

        if loop_controller::wants_continue(&outputs) {
            loop_controller::reset_loop_nodes(
                self.workflow.graph(),
                &mut state.graph,
                &mut state.context.node_results,
                node_id,
            );
        }

        let progress = self.progress(&state.graph).await;
        drop(state);

        self.notifier.notify(ExecutionEvent::NodeCompleted {
            node_id: node_id.to_string(),
            data: output_value,
            progress,
        });
    }

    async fn fail_node(&self, node_id: &str, message: String) {
        self.fail_node_with_outputs(node_id, message, None).await
    }

    /// Records a node failure. `outputs` carries the node's own output map
    /// when the failure came from a soft error detected by
    /// `soft_error_message`, so it survives in `metadata.soft_error` for
    /// debugging rather than being discarded.
    async fn fail_node_with_outputs(&self, node_id: &str, message: String, outputs: Option<PortMap>) {
        let mut state = self.state.lock().await;
        state.graph.set_phase(node_id, NodePhase::Failed);
        state.context.errors.push(format!("{node_id}: {message}"));

        let mut result = NodeExecutionResult::running(Utc::now());
        result.success = false;
        result.error = Some(message.clone());
        result.completed_at = Some(Utc::now());
        if let Some(outputs) = outputs {
            result.outputs = outputs;
            result.mark_soft_error();
        }
        state.context.record_result(node_id, result);

        let progress = self.progress(&state.graph).await;
        let stop_on_error = self.workflow.execution_constraints.stop_on_error;
        drop(state);

        warn!(node_id, message, "node execution failed");
        self.notifier.notify(ExecutionEvent::NodeFailed {
            node_id: node_id.to_string(),
            error: message,
            progress,
        });

        if stop_on_error {
            self.cancel.cancel();
        }
    }

    /// Marks a node paused awaiting a human decision. The scheduler treats
    /// it as non-terminal but non-runnable until `resume_interaction` fires.
    pub async fn pause_for_interaction(&self, node_id: &str, form: Value) {
        let mut state = self.state.lock().await;
        state.graph.set_phase(node_id, NodePhase::AwaitingInteraction);
        state.context.pending_interactions.insert(node_id.to_string(), form.clone());
        state.context.status = ExecutionStatus::Paused;
        drop(state);

        self.notifier.notify(ExecutionEvent::ExecutionPaused { node_id: node_id.to_string() });
        self.notifier.notify(ExecutionEvent::InteractionRequired { node_id: node_id.to_string(), form });
    }

    /// Resumes a node paused with `pause_for_interaction`, treating the
    /// supplied outputs as if the node had just completed normally.
    pub async fn resume_interaction(self: &Arc<Self>, node_id: &str, outputs: PortMap) {
        {
            let mut state = self.state.lock().await;
            state.context.pending_interactions.remove(node_id);
            state.context.status = ExecutionStatus::Running;
        }
        self.notifier.notify(ExecutionEvent::ExecutionResumed { node_id: node_id.to_string() });
        self.complete_node(node_id, outputs, Utc::now(), &CredentialMap::new()).await;
        self.pause.notify_waiters();
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub async fn interaction_pending(&self) -> HashSet<String> {
        let state = self.state.lock().await;
        state.context.pending_interactions.keys().cloned().collect()
    }
}

/// A node skipped by branch pruning never executes, so nothing ever calls
/// `complete_node` to fan its skip out to its own dependents. This walks
/// `node_id`'s outgoing edges and decrements each target's dependency count
/// as non-live, recursing into any target that itself becomes `Skipped` as a
/// result — the transitive "skip the whole blocked subgraph" behavior.
/// Targets reachable through a surviving branch keep at least one live
/// incoming edge and become `Ready` instead, stopping the cascade there.
fn cascade_skip(graph: &Graph, execution_graph: &mut ExecutionGraph, node_id: &str) {
    let targets: HashSet<String> = graph.downstream(node_id).iter().cloned().collect();
    for target in targets {
        let edges = graph
            .input_connections(&target)
            .iter()
            .filter(|conn| conn.source_node_id == node_id && conn.target_port != "tools")
            .filter(|conn| !graph.is_loop_back(node_id, &target));
        for _ in edges {
            if execution_graph.decrement_dep(&target, false) == DepTransition::Skipped {
                cascade_skip(graph, execution_graph, &target);
            }
        }
    }
}

/// True when a node's output carries the `_await: "human_input"` marker: the
/// node wants the workflow paused for an external decision rather than
/// treated as complete.
fn awaits_human_input(outputs: &PortMap) -> bool {
    matches!(outputs.get("_await"), Some(Value::String(s)) if s == "human_input")
}

/// Detects a node reporting failure through its own output map instead of
/// raising: a non-null `error`/`_error` field, or an explicit `success: false`.
fn soft_error_message(outputs: &PortMap) -> Option<String> {
    if let Some(value) = outputs.get("error").or_else(|| outputs.get("_error")) {
        if !value.is_null() {
            return Some(match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        }
    }
    if matches!(outputs.get("success"), Some(Value::Bool(false))) {
        return Some("node reported success: false".to_string());
    }
    None
}
