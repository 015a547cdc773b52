use crate::{events::EventEmitter, Config, ExecutionContext, NodeError, NodeKind, NodeSpec};
use async_trait::async_trait;

/// Core trait that every node operation implements
#[async_trait]
pub trait Node: Send + Sync {
    /// Operation this implementation handles
    fn kind(&self) -> NodeKind;

    /// Execute the node against the run's shared variables.
    ///
    /// Parameter validation must happen before any side effect.
    async fn execute(&self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError>;
}

/// Everything a node sees while it executes
pub struct NodeContext<'a> {
    /// The node being executed
    pub node: &'a NodeSpec,

    /// Run-scoped variables
    pub variables: &'a mut ExecutionContext,

    /// Event emitter for real-time updates
    pub events: EventEmitter,
}

impl<'a> NodeContext<'a> {
    pub fn new(node: &'a NodeSpec, variables: &'a mut ExecutionContext, events: EventEmitter) -> Self {
        Self {
            node,
            variables,
            events,
        }
    }

    /// Handler parameters of the current node
    pub fn config(&self) -> Config<'a> {
        self.node.config()
    }

    pub fn node_id(&self) -> &'a str {
        &self.node.id
    }
}
