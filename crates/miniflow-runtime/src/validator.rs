//! Structural checks on a workflow document, mirroring the editor's rules.
//!
//! Validation is advisory: the runner executes any graph that has a Start
//! node. These checks catch the shapes the editor refuses to save.

use miniflow_core::{NodeKind, Value, Workflow};
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, Reversed};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A single problem found in a workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub node_id: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    fn workflow(message: impl Into<String>) -> Self {
        Self {
            node_id: None,
            message: message.into(),
        }
    }

    fn node(node_id: &str, message: impl Into<String>) -> Self {
        Self {
            node_id: Some(node_id.to_string()),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node_id {
            Some(id) => write!(f, "{} (node {})", self.message, id),
            None => f.write_str(&self.message),
        }
    }
}

pub fn validate(workflow: &Workflow) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();
    let mut kinds: HashMap<&str, Option<NodeKind>> = HashMap::new();

    for node in &workflow.nodes {
        if index.contains_key(node.id.as_str()) {
            issues.push(ValidationIssue::node(&node.id, "Duplicate node id"));
            continue;
        }
        index.insert(&node.id, graph.add_node(&node.id));

        let kind = node.kind().ok();
        if kind.is_none() {
            issues.push(ValidationIssue::node(
                &node.id,
                format!("Unknown node type '{}'", node.node_type),
            ));
        }
        kinds.insert(&node.id, kind);
    }

    for edge in &workflow.edges {
        match (index.get(edge.source.as_str()), index.get(edge.target.as_str())) {
            (Some(from), Some(to)) => {
                graph.add_edge(*from, *to, ());
            }
            _ => issues.push(ValidationIssue::workflow(format!(
                "Edge {} -> {} references an unknown node",
                edge.source, edge.target
            ))),
        }
    }

    let of_kind = |wanted: NodeKind| -> Vec<&str> {
        workflow
            .nodes
            .iter()
            .filter(|n| kinds.get(n.id.as_str()) == Some(&Some(wanted)))
            .map(|n| n.id.as_str())
            .collect()
    };

    let starts = of_kind(NodeKind::Start);
    if starts.len() != 1 {
        issues.push(ValidationIssue::workflow("There must be exactly one START node"));
    }

    if is_cyclic_directed(&graph) {
        issues.push(ValidationIssue::workflow("Cycles are not allowed in the workflow"));
    }

    if let Some(start) = starts.first().and_then(|id| index.get(id)) {
        let reachable = collect_bfs(&graph, *start);
        if graph.node_indices().any(|n| !reachable.contains(&n)) {
            issues.push(ValidationIssue::workflow("Some nodes are unreachable from START"));
        }
    }

    let ends = of_kind(NodeKind::End);
    if ends.len() != 1 {
        issues.push(ValidationIssue::workflow("There must be exactly one END node"));
    }

    if let Some(end) = ends.first().and_then(|id| index.get(id)) {
        if workflow.outgoing(graph[*end]).next().is_some() {
            issues.push(ValidationIssue::workflow("The END node must not have outgoing edges"));
        }

        let reaches_end = collect_bfs(&Reversed(&graph), *end);
        if graph.node_indices().any(|n| !reaches_end.contains(&n)) {
            issues.push(ValidationIssue::workflow("Some nodes never reach the END node"));
        }

        let bad_terminal = workflow.nodes.iter().any(|n| {
            workflow.outgoing(&n.id).next().is_none()
                && kinds.get(n.id.as_str()) != Some(&Some(NodeKind::End))
        });
        if bad_terminal {
            issues.push(ValidationIssue::workflow(
                "Only the END node may be terminal (without outgoing edges)",
            ));
        }
    }

    for node in &workflow.nodes {
        let config = node.config();
        let blank = |key: &str| {
            config
                .get(key)
                .map(|v| v.to_string().trim().is_empty())
                .unwrap_or(true)
        };

        match node.kind() {
            Ok(NodeKind::HttpRequest) => {
                if blank("url") {
                    issues.push(ValidationIssue::node(&node.id, "HTTP_REQUEST without URL"));
                }
                if let Some(timeout) = config.get("timeoutMs") {
                    if !numeric(timeout).map(|t| t > 0.0).unwrap_or(false) {
                        issues.push(ValidationIssue::node(&node.id, "HTTP_REQUEST invalid timeout"));
                    }
                }
                if let Some(retries) = config.get("retries") {
                    if !numeric(retries).map(|r| r >= 0.0).unwrap_or(false) {
                        issues.push(ValidationIssue::node(&node.id, "HTTP_REQUEST invalid retries"));
                    }
                }
            }
            Ok(NodeKind::Conditional) => {
                if blank("condition") && blank("expression") {
                    issues.push(ValidationIssue::node(&node.id, "CONDITIONAL without condition"));
                }
                let labels: Vec<String> = workflow
                    .outgoing(&node.id)
                    .map(|e| {
                        e.label
                            .as_deref()
                            .or(e.source_handle.as_deref())
                            .unwrap_or("")
                            .trim()
                            .to_uppercase()
                    })
                    .collect();
                let has = |l: &str| labels.iter().any(|x| x == l);
                if !(labels.len() == 2 && has("TRUE") && has("FALSE")) {
                    issues.push(ValidationIssue::node(
                        &node.id,
                        "CONDITIONAL must have 2 outputs: TRUE and FALSE",
                    ));
                }
            }
            Ok(NodeKind::Command) => {
                if blank("command") {
                    issues.push(ValidationIssue::node(&node.id, "COMMAND without command"));
                }
            }
            Ok(NodeKind::CreateFolder) => {
                if blank("folderName") || blank("folderPath") {
                    issues.push(ValidationIssue::node(
                        &node.id,
                        "CREATE_FOLDER without folderName or folderPath",
                    ));
                }
            }
            _ => {}
        }
    }

    issues
}

fn collect_bfs<G>(graph: G, start: NodeIndex) -> HashSet<NodeIndex>
where
    G: petgraph::visit::IntoNeighbors<NodeId = NodeIndex> + petgraph::visit::Visitable,
{
    let mut seen = HashSet::new();
    let mut bfs = Bfs::new(graph, start);
    while let Some(n) = bfs.next(graph) {
        seen.insert(n);
    }
    seen
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        other => other.as_f64(),
    }
}
