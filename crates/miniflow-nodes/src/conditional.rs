use async_trait::async_trait;
use miniflow_core::{keys, ExecutionContext, Node, NodeContext, NodeError, NodeKind, Value};
use miniflow_runtime::{ConfigKey, NodeFactory, NodeMetadata};

/// Evaluates `<variable> == <literal>` or `<variable> != <literal>` and
/// writes `"TRUE"` / `"FALSE"` to the branch key.
pub struct ConditionalNode;

#[async_trait]
impl Node for ConditionalNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Conditional
    }

    async fn execute(&self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        let condition = ctx
            .config()
            .first_str(&["condition", "expression"])?
            .ok_or_else(|| NodeError::Configuration("Missing condition in node config".into()))?;

        let result = evaluate(condition, ctx.variables);
        let branch = if result { "TRUE" } else { "FALSE" };

        tracing::debug!(node = %ctx.node_id(), condition, branch, "Condition evaluated");
        ctx.variables.set(keys::BRANCH, branch);

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
}

/// Evaluate a single binary comparison against the context.
///
/// The earliest `==` or `!=` splits the expression; without either operator
/// the result is false.
pub fn evaluate(expression: &str, ctx: &ExecutionContext) -> bool {
    let expr = expression.trim();

    let op = match (expr.find("=="), expr.find("!=")) {
        (Some(eq), Some(ne)) if ne < eq => (ne, Op::Ne),
        (Some(eq), _) => (eq, Op::Eq),
        (None, Some(ne)) => (ne, Op::Ne),
        (None, None) => return false,
    };
    let (at, op) = op;

    let left = expr[..at].trim();
    let right = expr[at + 2..].trim();
    let name = left.strip_prefix("context.").unwrap_or(left);

    let lhs = ctx.get(name).filter(|v| !v.is_null());
    let rhs = parse_literal(right);

    let equal = match (lhs, rhs.as_ref()) {
        (None, None) => true,
        (None, Some(_)) | (Some(_), None) => false,
        (Some(l), Some(r)) => values_equal(l, r),
    };

    match op {
        Op::Eq => equal,
        Op::Ne => !equal,
    }
}

/// Numeric operands compare numerically; anything else compares by string form
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => left.to_string() == right.to_string(),
    }
}

/// Right-hand literal. An empty right side is the absent literal.
fn parse_literal(raw: &str) -> Option<Value> {
    let r = raw.trim();
    if r.is_empty() {
        return None;
    }

    let quoted = r.len() >= 2
        && ((r.starts_with('"') && r.ends_with('"')) || (r.starts_with('\'') && r.ends_with('\'')));
    if quoted {
        return Some(Value::String(r[1..r.len() - 1].to_string()));
    }

    if r.eq_ignore_ascii_case("true") {
        return Some(Value::Bool(true));
    }
    if r.eq_ignore_ascii_case("false") {
        return Some(Value::Bool(false));
    }
    if let Ok(n) = r.parse::<i64>() {
        return Some(Value::Integer(n));
    }
    if let Ok(n) = r.parse::<f64>() {
        if n.is_finite() {
            return Some(Value::Float(n));
        }
    }

    Some(Value::String(r.to_string()))
}

pub struct ConditionalNodeFactory;

impl NodeFactory for ConditionalNodeFactory {
    fn create(&self) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(ConditionalNode))
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Conditional
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Branch on an equality comparison against a context variable".to_string(),
            category: "control".to_string(),
            config_keys: vec![
                ConfigKey::required("condition", "e.g. `count == 3` (alias: expression)"),
            ],
        }
    }
}
