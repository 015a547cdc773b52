use async_trait::async_trait;
use miniflow_core::{Node, NodeContext, NodeError, NodeKind};
use miniflow_runtime::{NodeFactory, NodeMetadata};

/// Entry point of every workflow; does nothing
pub struct StartNode;

#[async_trait]
impl Node for StartNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Start
    }

    async fn execute(&self, _ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        Ok(())
    }
}

pub struct StartNodeFactory;

impl NodeFactory for StartNodeFactory {
    fn create(&self) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(StartNode))
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Start
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Entry point of the workflow".to_string(),
            category: "control".to_string(),
            config_keys: vec![],
        }
    }
}

/// Terminal node. The runner stops after executing it.
pub struct EndNode;

#[async_trait]
impl Node for EndNode {
    fn kind(&self) -> NodeKind {
        NodeKind::End
    }

    async fn execute(&self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        ctx.events.info(format!("Node {} END", ctx.node_id()));
        Ok(())
    }
}

pub struct EndNodeFactory;

impl NodeFactory for EndNodeFactory {
    fn create(&self) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(EndNode))
    }

    fn kind(&self) -> NodeKind {
        NodeKind::End
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Ends the workflow".to_string(),
            category: "control".to_string(),
            config_keys: vec![],
        }
    }
}
