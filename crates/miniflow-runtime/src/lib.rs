//! Workflow execution runtime
//!
//! This crate provides the graph interpreter that walks a workflow from its
//! Start node, the registry mapping node types to handlers, and the
//! structural validator used before saving or running a document.

mod executor;
mod registry;
mod runtime;
mod trace;
mod validator;

pub use executor::{ExecutionResult, RunStatus, WorkflowRunner};
pub use registry::{ConfigKey, NodeFactory, NodeMetadata, NodeRegistry};
pub use runtime::{FlowRuntime, RuntimeConfig};
pub use trace::{format_response, NodeTrace};
pub use validator::{validate, ValidationIssue};
