use crate::registry::NodeRegistry;
use crate::trace::NodeTrace;
use chrono::Utc;
use miniflow_core::{
    keys, Edge, ErrorPolicy, EventBus, ExecutionContext, ExecutionEvent, ExecutionId, FlowError,
    NodeContext, NodeError, NodeKind, NodeSpec, Value, Workflow,
};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

/// Walks a workflow graph one node at a time.
///
/// Strictly sequential: a node runs to completion before the next one is
/// resolved from the edge set.
pub struct WorkflowRunner;

impl WorkflowRunner {
    pub fn new() -> Self {
        Self
    }

    /// Execute a workflow from its Start node.
    ///
    /// `ctx` is cleared and seeded with `initial_inputs` before the first node
    /// runs. Only setup failures (no Start node) are returned as `Err`; node
    /// failures are recorded in the result and governed by each node's policy.
    pub async fn execute(
        &self,
        workflow: &Workflow,
        registry: &NodeRegistry,
        event_bus: &EventBus,
        ctx: &mut ExecutionContext,
        initial_inputs: HashMap<String, Value>,
    ) -> Result<ExecutionResult, FlowError> {
        let execution_id = ExecutionId::new_v4();
        let start_time = Instant::now();

        let start = workflow.start_node()?;

        ctx.clear();
        for (key, value) in initial_inputs {
            ctx.set(key, value);
        }

        event_bus.emit(ExecutionEvent::WorkflowStarted {
            execution_id,
            workflow_name: workflow.display_name().to_string(),
            timestamp: Utc::now(),
        });

        tracing::info!(%execution_id, "Starting workflow: {}", workflow.display_name());

        let mut has_errors = false;
        let mut trace = Vec::new();
        let mut last_node = None;
        let mut current = Some(start);

        while let Some(node) = current {
            event_bus.emit(ExecutionEvent::NodeStarted {
                execution_id,
                node_id: node.id.clone(),
                node_type: node.node_type.clone(),
                timestamp: Utc::now(),
            });

            let node_start = Instant::now();
            let outcome = self.execute_node(node, registry, event_bus, execution_id, ctx).await;
            let duration_ms = node_start.elapsed().as_millis() as u64;

            last_node = Some(node.id.clone());

            let error = match outcome {
                Ok(()) => None,
                Err(e) => {
                    has_errors = true;
                    let message = e.message();
                    ctx.set(keys::LAST_ERROR, message.clone());
                    Some(message)
                }
            };

            let entry = NodeTrace::new(node, ctx, error.as_deref());

            if let Some(error) = error {
                let policy = node.effective_error_policy();
                let halted = policy == ErrorPolicy::StopOnFail;

                event_bus.emit(ExecutionEvent::NodeFailed {
                    execution_id,
                    node_id: node.id.clone(),
                    error: error.clone(),
                    halted,
                    timestamp: Utc::now(),
                });

                trace.push(entry);

                if halted {
                    tracing::error!(node = %node.id, "Node failed, stopping workflow: {}", error);
                    break;
                }
                tracing::warn!(node = %node.id, %policy, "Node failed, continuing: {}", error);
            } else {
                tracing::info!(node = %node.id, "Node completed in {}ms", duration_ms);

                event_bus.emit(ExecutionEvent::NodeCompleted {
                    execution_id,
                    node_id: node.id.clone(),
                    response: entry.response.clone(),
                    duration_ms,
                    timestamp: Utc::now(),
                });

                trace.push(entry);
            }

            if matches!(node.kind(), Ok(NodeKind::End)) {
                break;
            }

            current = self.resolve_next(workflow, node, ctx);
        }

        ctx.set(keys::WORKFLOW_HAS_ERRORS, has_errors);

        let duration_ms = start_time.elapsed().as_millis() as u64;

        event_bus.emit(ExecutionEvent::WorkflowCompleted {
            execution_id,
            has_errors,
            duration_ms,
            timestamp: Utc::now(),
        });

        tracing::info!(%execution_id, has_errors, "Workflow finished in {}ms", duration_ms);

        Ok(ExecutionResult {
            execution_id,
            workflow_name: workflow.display_name().to_string(),
            status: RunStatus::from_errors(has_errors),
            has_errors,
            trace,
            last_node,
            duration_ms,
            variables: ctx.variables().clone(),
        })
    }

    async fn execute_node(
        &self,
        node: &NodeSpec,
        registry: &NodeRegistry,
        event_bus: &EventBus,
        execution_id: ExecutionId,
        ctx: &mut ExecutionContext,
    ) -> Result<(), NodeError> {
        let handler = registry.resolve(&node.node_type)?;
        let events = event_bus.create_emitter(execution_id, node.id.clone());
        let mut node_ctx = NodeContext::new(node, ctx, events);

        handler.execute(&mut node_ctx).await
    }

    /// Pick the next node from the current node's outgoing edges.
    ///
    /// Conditional nodes follow the edge whose label or source handle matches
    /// the branch value; every other node follows its first outgoing edge.
    /// A missing edge or a dangling target ends the run.
    fn resolve_next<'w>(
        &self,
        workflow: &'w Workflow,
        node: &NodeSpec,
        ctx: &ExecutionContext,
    ) -> Option<&'w NodeSpec> {
        let branch = match node.kind() {
            Ok(NodeKind::Conditional) => ctx.branch(),
            _ => None,
        };

        let mut outgoing = workflow.outgoing(&node.id);
        let edge: Option<&Edge> = match branch.as_deref() {
            Some(branch) => outgoing.find(|e| e.matches_branch(branch)),
            None => outgoing.next(),
        };

        let next = edge.and_then(|e| workflow.find_node(&e.target));

        match (edge, next) {
            (None, _) => tracing::debug!(node = %node.id, "No outgoing edge, workflow ends"),
            (Some(e), None) => {
                tracing::debug!(node = %node.id, target = %e.target, "Edge target not found, workflow ends")
            }
            (Some(_), Some(n)) => tracing::debug!(from = %node.id, to = %n.id, "Following edge"),
        }

        next
    }
}

impl Default for WorkflowRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Final status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Finished,
    FinishedWithErrors,
}

impl RunStatus {
    pub fn from_errors(has_errors: bool) -> Self {
        if has_errors {
            RunStatus::FinishedWithErrors
        } else {
            RunStatus::Finished
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Finished => "FINISHED",
            RunStatus::FinishedWithErrors => "FINISHED_WITH_ERRORS",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of workflow execution
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub execution_id: ExecutionId,
    pub workflow_name: String,
    pub status: RunStatus,
    pub has_errors: bool,
    /// One entry per executed node, in execution order
    pub trace: Vec<NodeTrace>,
    /// Id of the last node that ran
    pub last_node: Option<String>,
    pub duration_ms: u64,
    /// Snapshot of the context when the run ended
    pub variables: HashMap<String, Value>,
}

impl ExecutionResult {
    /// Ids of executed nodes, in order
    pub fn executed_nodes(&self) -> Vec<&str> {
        self.trace.iter().map(|t| t.node_id.as_str()).collect()
    }

    pub fn variable(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }
}
