use crate::{registry::NodeRegistry, ExecutionResult, WorkflowRunner};
use miniflow_core::{EventBus, ExecutionContext, FlowError, Value, Workflow};
use std::collections::HashMap;
use std::sync::Arc;

/// Main runtime for executing workflows
pub struct FlowRuntime {
    registry: Arc<NodeRegistry>,
    runner: WorkflowRunner,
    event_bus: Arc<EventBus>,
}

impl FlowRuntime {
    /// Create a new runtime with an empty registry
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_registry(Arc::new(NodeRegistry::new()), config)
    }

    /// Create a new runtime with a pre-configured registry
    pub fn with_registry(registry: Arc<NodeRegistry>, config: RuntimeConfig) -> Self {
        Self {
            registry,
            runner: WorkflowRunner::new(),
            event_bus: Arc::new(EventBus::new(config.event_buffer_size)),
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Execute a workflow with its own fresh context
    pub async fn execute(
        &self,
        workflow: &Workflow,
        inputs: HashMap<String, Value>,
    ) -> Result<ExecutionResult, FlowError> {
        let mut ctx = ExecutionContext::new();
        self.execute_with_context(workflow, &mut ctx, inputs).await
    }

    /// Execute a workflow against a caller-owned context.
    ///
    /// The context is cleared first; after the run it holds the final variables.
    pub async fn execute_with_context(
        &self,
        workflow: &Workflow,
        ctx: &mut ExecutionContext,
        inputs: HashMap<String, Value>,
    ) -> Result<ExecutionResult, FlowError> {
        self.runner
            .execute(workflow, &self.registry, &self.event_bus, ctx, inputs)
            .await
    }

    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<miniflow_core::ExecutionEvent> {
        self.event_bus.subscribe()
    }
}

impl Default for FlowRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Capacity of the broadcast channel; slow subscribers lag past this
    pub event_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
        }
    }
}
