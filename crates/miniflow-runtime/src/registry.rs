use miniflow_core::{Node, NodeError, NodeKind};
use std::collections::HashMap;
use std::sync::Arc;

/// Factory trait for creating node instances
pub trait NodeFactory: Send + Sync {
    /// Create a new instance of the node
    fn create(&self) -> Result<Box<dyn Node>, NodeError>;

    /// Operation this factory builds
    fn kind(&self) -> NodeKind;

    /// Optional: description and category for listings
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::default()
    }
}

/// Metadata about a node type
#[derive(Debug, Clone)]
pub struct NodeMetadata {
    pub description: String,
    pub category: String,
    pub config_keys: Vec<ConfigKey>,
}

impl Default for NodeMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
            config_keys: Vec::new(),
        }
    }
}

/// A configuration parameter a node reads from `data.config`
#[derive(Debug, Clone)]
pub struct ConfigKey {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl ConfigKey {
    pub fn required(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: true,
        }
    }

    pub fn optional(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: false,
        }
    }
}

/// Registry of available node types
pub struct NodeRegistry {
    factories: HashMap<NodeKind, Arc<dyn NodeFactory>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a node factory, replacing any previous one for the same kind
    pub fn register(&mut self, factory: Arc<dyn NodeFactory>) {
        let kind = factory.kind();
        tracing::debug!("Registering node type: {}", kind);
        self.factories.insert(kind, factory);
    }

    /// Resolve a type tag (case-insensitive) to a fresh handler
    pub fn resolve(&self, node_type: &str) -> Result<Box<dyn Node>, NodeError> {
        let kind: NodeKind = node_type.parse()?;
        let factory = self
            .factories
            .get(&kind)
            .ok_or_else(|| NodeError::Configuration(format!("unknown type: {}", node_type)))?;

        factory.create()
    }

    /// Registered kinds, in declaration order
    pub fn list_node_types(&self) -> Vec<NodeKind> {
        NodeKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.factories.contains_key(kind))
            .collect()
    }

    pub fn get_metadata(&self, kind: NodeKind) -> Option<NodeMetadata> {
        self.factories.get(&kind).map(|f| f.metadata())
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
