//! Standard node library
//!
//! The six built-in operations: Start, End, CreateFolder, Conditional,
//! Command and HttpRequest.

mod command;
mod conditional;
mod control;
mod folder;
mod http;
pub mod mapping;
pub mod template;

pub use command::CommandNode;
pub use conditional::{evaluate as evaluate_condition, ConditionalNode};
pub use control::{EndNode, StartNode};
pub use folder::CreateFolderNode;
pub use http::HttpRequestNode;
use miniflow_runtime::NodeRegistry;

use std::sync::Arc;

/// Register all standard nodes with a registry
pub fn register_all(registry: &mut NodeRegistry) {
    registry.register(Arc::new(control::StartNodeFactory));
    registry.register(Arc::new(control::EndNodeFactory));
    registry.register(Arc::new(folder::CreateFolderNodeFactory));
    registry.register(Arc::new(conditional::ConditionalNodeFactory));
    registry.register(Arc::new(command::CommandNodeFactory));
    registry.register(Arc::new(http::HttpRequestNodeFactory));
}

/// A registry with every standard node registered
pub fn default_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    register_all(&mut registry);
    registry
}
