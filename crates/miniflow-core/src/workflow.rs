use crate::{Config, FlowError, NodeError, Value, WorkflowError};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub type NodeId = String;

/// Complete workflow definition as produced by the editor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: Vec<NodeSpec>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub edges: Vec<Edge>,
}

/// Explicit `null` reads the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Parse the editor's JSON document; unknown fields are ignored
    pub fn from_json(document: &str) -> Result<Self, FlowError> {
        Ok(serde_json::from_str(document)?)
    }

    pub fn add_node(&mut self, node: NodeSpec) -> NodeId {
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }

    pub fn connect(&mut self, source: impl Into<String>, target: impl Into<String>) {
        self.edges.push(Edge::new(source, target));
    }

    /// Connect two nodes through an edge labeled with a branch value
    pub fn connect_labeled(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        label: impl Into<String>,
    ) {
        self.edges.push(Edge::new(source, target).with_label(label));
    }

    pub fn find_node(&self, id: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// First node whose type tag parses as `Start`
    pub fn start_node(&self) -> Result<&NodeSpec, WorkflowError> {
        self.nodes
            .iter()
            .find(|n| matches!(n.kind(), Ok(NodeKind::Start)))
            .ok_or(WorkflowError::MissingStart)
    }

    /// Outgoing edges of a node, in document order
    pub fn outgoing<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "Workflow"
        } else {
            &self.name
        }
    }
}

/// Node definition in a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: NodeId,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: HashMap<String, Value>,
    #[serde(rename = "errorPolicy", default, skip_serializing_if = "Option::is_none")]
    pub error_policy: Option<String>,
}

impl NodeSpec {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            data: HashMap::new(),
            error_policy: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.data.insert("label".to_string(), Value::String(label.into()));
        self
    }

    /// Insert a key into the nested `data.config` mapping, creating it if needed
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let entry = self
            .data
            .entry("config".to_string())
            .or_insert_with(|| Value::Object(HashMap::new()));
        if !matches!(entry, Value::Object(_)) {
            *entry = Value::Object(HashMap::new());
        }
        if let Value::Object(config) = entry {
            config.insert(key.into(), value.into());
        }
        self
    }

    pub fn with_error_policy(mut self, policy: impl Into<String>) -> Self {
        self.error_policy = Some(policy.into());
        self
    }

    pub fn kind(&self) -> Result<NodeKind, NodeError> {
        self.node_type.parse()
    }

    pub fn label(&self) -> String {
        self.data.get("label").map(|v| v.to_string()).unwrap_or_default()
    }

    /// Handler parameters: `data.config` when it is a mapping, else `data` itself
    pub fn config(&self) -> Config<'_> {
        match self.data.get("config") {
            Some(Value::Object(config)) => Config::new(config),
            _ => Config::new(&self.data),
        }
    }

    /// Node-level policy, then `config.errorPolicy`, then `data.errorPolicy`
    pub fn effective_error_policy(&self) -> ErrorPolicy {
        if let Some(policy) = self.error_policy.as_deref().filter(|s| !s.trim().is_empty()) {
            return ErrorPolicy::parse_lenient(policy);
        }

        let policy_in = |value: Option<&Value>| -> Option<ErrorPolicy> {
            value
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(ErrorPolicy::parse_lenient)
        };

        policy_in(self.config().get("errorPolicy"))
            .or_else(|| policy_in(self.data.get("errorPolicy")))
            .unwrap_or_default()
    }
}

/// Directed, optionally labeled link between two nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "sourceHandle", default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label: None,
            source_handle: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_source_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }

    /// True when the label or source handle equals `branch`, ignoring case
    pub fn matches_branch(&self, branch: &str) -> bool {
        let eq = |s: &Option<String>| {
            s.as_deref()
                .map(|s| s.eq_ignore_ascii_case(branch))
                .unwrap_or(false)
        };
        eq(&self.label) || eq(&self.source_handle)
    }
}

/// Closed set of node operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Start,
    End,
    CreateFolder,
    Conditional,
    Command,
    HttpRequest,
}

impl NodeKind {
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Start,
        NodeKind::End,
        NodeKind::CreateFolder,
        NodeKind::Conditional,
        NodeKind::Command,
        NodeKind::HttpRequest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Start => "Start",
            NodeKind::End => "End",
            NodeKind::CreateFolder => "CreateFolder",
            NodeKind::Conditional => "Conditional",
            NodeKind::Command => "Command",
            NodeKind::HttpRequest => "HttpRequest",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive; `_` and `-` separators are ignored so `CREATE_FOLDER`
/// and `create-folder` both name `CreateFolder`.
impl FromStr for NodeKind {
    type Err = NodeError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let normalized: String = tag
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "start" => Ok(NodeKind::Start),
            "end" => Ok(NodeKind::End),
            "createfolder" => Ok(NodeKind::CreateFolder),
            "conditional" => Ok(NodeKind::Conditional),
            "command" => Ok(NodeKind::Command),
            "httprequest" => Ok(NodeKind::HttpRequest),
            _ => Err(NodeError::Configuration(format!("unknown type: {}", tag))),
        }
    }
}

/// Whether a node failure halts the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorPolicy {
    #[default]
    StopOnFail,
    ContinueOnFail,
}

impl ErrorPolicy {
    /// Only `CONTINUE_ON_FAIL` (any case) continues; every other value stops
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("CONTINUE_ON_FAIL") {
            ErrorPolicy::ContinueOnFail
        } else {
            ErrorPolicy::StopOnFail
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::StopOnFail => f.write_str("STOP_ON_FAIL"),
            ErrorPolicy::ContinueOnFail => f.write_str("CONTINUE_ON_FAIL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_tolerates_nulls() {
        let wf = Workflow::from_json(
            r#"{
                "name": null,
                "nodes": [
                    {"id": "s", "type": "START", "data": null},
                    {"id": "e", "type": "END", "position": {"x": 1}}
                ],
                "edges": [{"source": "s", "target": "e", "label": null}]
            }"#,
        )
        .unwrap();

        assert_eq!(wf.display_name(), "Workflow");
        assert!(wf.nodes[0].data.is_empty());
        assert_eq!(wf.nodes[0].label(), "");
        assert!(wf.nodes[0].config().get("url").is_none());
        assert_eq!(wf.start_node().unwrap().id, "s");
        assert_eq!(wf.outgoing("s").count(), 1);
    }

    #[test]
    fn test_from_json_reports_malformed_document() {
        let err = Workflow::from_json("{\"nodes\": 3}").unwrap_err();
        assert!(matches!(err, FlowError::Serialization(_)));
    }

    #[test]
    fn test_node_kind_parsing() {
        assert_eq!("start".parse::<NodeKind>().unwrap(), NodeKind::Start);
        assert_eq!("HttpRequest".parse::<NodeKind>().unwrap(), NodeKind::HttpRequest);
        assert_eq!("HTTP_REQUEST".parse::<NodeKind>().unwrap(), NodeKind::HttpRequest);
        assert_eq!("create-folder".parse::<NodeKind>().unwrap(), NodeKind::CreateFolder);

        let err = "Sleep".parse::<NodeKind>().unwrap_err();
        assert_eq!(err.message(), "unknown type: Sleep");
    }

    #[test]
    fn test_config_falls_back_to_data() {
        let json = r#"{"id": "n1", "type": "Command", "data": {"label": "Run", "command": "ls"}}"#;
        let node: NodeSpec = serde_json::from_str(json).unwrap();
        assert_eq!(node.config().get("command"), Some(&Value::from("ls")));
        assert_eq!(node.label(), "Run");
    }

    #[test]
    fn test_error_policy_resolution_order() {
        let node = NodeSpec::new("n", "Command").with_config("errorPolicy", "CONTINUE_ON_FAIL");
        assert_eq!(node.effective_error_policy(), ErrorPolicy::ContinueOnFail);

        let node = node.with_error_policy("STOP_ON_FAIL");
        assert_eq!(node.effective_error_policy(), ErrorPolicy::StopOnFail);

        let mut node = NodeSpec::new("n", "Command").with_config("command", "ls");
        node.data.insert("errorPolicy".into(), "continue_on_fail".into());
        assert_eq!(node.effective_error_policy(), ErrorPolicy::ContinueOnFail);

        assert_eq!(NodeSpec::new("n", "End").effective_error_policy(), ErrorPolicy::StopOnFail);
    }

    #[test]
    fn test_edge_branch_match_is_case_insensitive() {
        assert!(Edge::new("a", "b").with_label("True").matches_branch("TRUE"));
        assert!(Edge::new("a", "b").with_source_handle("false").matches_branch("FALSE"));
        assert!(!Edge::new("a", "b").matches_branch("TRUE"));
    }

    #[test]
    fn test_workflow_document_ignores_presentation_fields() {
        let json = r#"{
            "name": "demo",
            "nodes": [{"id": "s", "type": "START", "position": {"x": 1, "y": 2}, "width": 10, "data": {"label": "Start"}}],
            "edges": []
        }"#;
        let workflow: Workflow = serde_json::from_str(json).unwrap();
        assert_eq!(workflow.start_node().unwrap().id, "s");
    }
}
