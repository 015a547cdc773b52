use miniflow_core::{keys, ExecutionContext, NodeKind, NodeSpec, Value};
use serde::Serialize;
use std::fmt;

const STDOUT_PREVIEW_CHARS: usize = 200;

/// One executed node, as shown in the run trace
#[derive(Debug, Clone, Serialize)]
pub struct NodeTrace {
    pub node_id: String,
    pub label: String,
    pub node_type: String,
    pub response: String,
    pub failed: bool,
}

impl NodeTrace {
    pub fn new(node: &NodeSpec, ctx: &ExecutionContext, error: Option<&str>) -> Self {
        Self {
            node_id: node.id.clone(),
            label: node.label(),
            node_type: node.node_type.clone(),
            response: format_response(node, ctx, error),
            failed: error.is_some(),
        }
    }
}

impl fmt::Display for NodeTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Nodo: \"{}\"", self.node_id)?;
        writeln!(f, "Descripcion: {}", self.label)?;
        writeln!(f, "Tipo: {}", self.node_type)?;
        write!(f, "Respuesta: {}", self.response)
    }
}

/// Type-specific one-line outcome of a node
pub fn format_response(node: &NodeSpec, ctx: &ExecutionContext, error: Option<&str>) -> String {
    if let Some(error) = error {
        return format!("ERROR: {}", error);
    }

    let config = node.config();
    let text = |key: &str| config.get(key).map(Value::to_string).unwrap_or_default();
    let var = |key: &str| ctx.get(key).map(Value::to_string).unwrap_or_default();

    match node.kind() {
        Ok(NodeKind::HttpRequest) => {
            let method = config
                .get("method")
                .map(Value::to_string)
                .unwrap_or_else(|| "GET".to_string());
            format!(
                "HTTP {} {} -> {}",
                method.to_uppercase(),
                text("url"),
                var(keys::STATUS)
            )
        }
        Ok(NodeKind::Conditional) => {
            let condition = match config.get("condition") {
                Some(c) => c.to_string(),
                None => text("expression"),
            };
            let branch = var(keys::BRANCH);
            if condition.trim().is_empty() {
                format!("Resultado = {}", branch)
            } else {
                format!("Condición: {} -> {}", condition, branch)
            }
        }
        Ok(NodeKind::Command) => {
            let command = text("command");
            let args = text("args");
            let full = if args.trim().is_empty() {
                command
            } else {
                format!("{} {}", command, args)
            };

            let stdout = one_line(&var(keys::LAST_STDOUT));
            if stdout.is_empty() {
                format!("Comando ejecutado: {}", full)
            } else {
                format!("Comando: {} | Salida: {}", full, stdout)
            }
        }
        _ => "OK".to_string(),
    }
}

/// Flatten to a single line and cap the length
fn one_line(text: &str) -> String {
    let flat = text.trim().replace('\r', "").replace('\n', " ");
    let flat = flat.trim();

    if flat.chars().count() > STDOUT_PREVIEW_CHARS {
        let cut: String = flat.chars().take(STDOUT_PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        flat.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_response_line() {
        let node = NodeSpec::new("h", "HttpRequest")
            .with_config("url", "http://example.test/ping")
            .with_config("method", "post");
        let mut ctx = ExecutionContext::new();
        ctx.set(keys::STATUS, 201i64);

        assert_eq!(
            format_response(&node, &ctx, None),
            "HTTP POST http://example.test/ping -> 201"
        );
    }

    #[test]
    fn test_conditional_response_line() {
        let node = NodeSpec::new("c", "Conditional").with_config("condition", "count == 3");
        let mut ctx = ExecutionContext::new();
        ctx.set(keys::BRANCH, "TRUE");

        assert_eq!(format_response(&node, &ctx, None), "Condición: count == 3 -> TRUE");
    }

    #[test]
    fn test_command_stdout_is_flattened_and_truncated() {
        let node = NodeSpec::new("c", "Command")
            .with_config("command", "echo")
            .with_config("args", "hi");
        let mut ctx = ExecutionContext::new();
        ctx.set(keys::LAST_STDOUT, format!("line1\r\nline2\n{}", "x".repeat(300)));

        let response = format_response(&node, &ctx, None);
        assert!(response.starts_with("Comando: echo hi | Salida: line1 line2 xxx"));
        assert!(response.ends_with("..."));

        let preview = response.trim_start_matches("Comando: echo hi | Salida: ");
        assert_eq!(preview.chars().count(), STDOUT_PREVIEW_CHARS + 3);
    }

    #[test]
    fn test_command_without_output() {
        let node = NodeSpec::new("c", "Command").with_config("command", "true");
        let ctx = ExecutionContext::new();
        assert_eq!(format_response(&node, &ctx, None), "Comando ejecutado: true");
    }

    #[test]
    fn test_error_and_default_lines() {
        let node = NodeSpec::new("s", "Start").with_label("Inicio");
        let ctx = ExecutionContext::new();

        assert_eq!(format_response(&node, &ctx, Some("boom")), "ERROR: boom");

        let trace = NodeTrace::new(&node, &ctx, None);
        assert_eq!(
            trace.to_string(),
            "Nodo: \"s\"\nDescripcion: Inicio\nTipo: Start\nRespuesta: OK"
        );
    }
}
