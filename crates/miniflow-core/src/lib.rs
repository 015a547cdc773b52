//! Core abstractions for the workflow interpreter
//!
//! This crate provides the fundamental types and traits that all other
//! components depend on: the workflow document model, the run-scoped
//! variable store, the node capability trait and the error taxonomy.

mod config;
mod context;
mod error;
pub mod events;
mod node;
mod value;
mod workflow;

pub use config::Config;
pub use context::{keys, ExecutionContext};
pub use error::{FlowError, NodeError, WorkflowError};
pub use events::*;
pub use node::{Node, NodeContext};
pub use value::Value;
pub use workflow::{Edge, ErrorPolicy, NodeId, NodeKind, NodeSpec, Workflow};

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
