use crate::template;
use async_trait::async_trait;
use miniflow_core::{keys, ExecutionContext, Node, NodeContext, NodeError, NodeKind};
use miniflow_runtime::{ConfigKey, NodeFactory, NodeMetadata};
use std::process::Stdio;
use tokio::process::Command;

/// Runs a command line through the platform shell and captures its output.
///
/// No timeout is applied: the node blocks until the process exits.
pub struct CommandNode;

#[async_trait]
impl Node for CommandNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Command
    }

    async fn execute(&self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        let config = ctx.config();
        let vars: &ExecutionContext = ctx.variables;

        let command = template::render(config.str_opt("command")?.unwrap_or(""), vars);
        let script_path = template::render(config.str_opt("scriptPath")?.unwrap_or(""), vars);
        let args = template::render(config.str_opt("args")?.unwrap_or(""), vars);
        let output_key = config.str_opt("outputKey")?.filter(|k| !k.trim().is_empty());

        if command.trim().is_empty() {
            return Err(NodeError::Configuration("Missing command in node config".into()));
        }

        let python = is_python_command(&command);
        if python {
            ensure_script_exists(&script_path).await?;
        }

        let args = build_args(python, &script_path, &args, vars);
        let line = if args.is_empty() {
            command.clone()
        } else {
            format!("{} {}", command, args)
        };

        ctx.events.info(format!("Running: {}", line));
        tracing::debug!(node = %ctx.node_id(), "Command line: {}", line);

        let output = shell(&line)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| NodeError::Process {
                exit_code: -1,
                message: format!("Failed to start shell: {}", e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        // Killed by a signal
        let exit_code = output.status.code().unwrap_or(-1);

        if !stderr.trim().is_empty() {
            ctx.events.warn(format!("stderr: {}", stderr.trim()));
        }

        ctx.variables.set(keys::LAST_STDOUT, stdout.clone());
        ctx.variables.set(keys::LAST_STDERR, stderr.clone());
        ctx.variables.set(keys::LAST_EXIT_CODE, exit_code as i64);
        if let Some(key) = output_key {
            ctx.variables.set(key, stdout);
        }

        if exit_code != 0 {
            let mut message = format!("Command failed with exit code {}", exit_code);
            if !stderr.trim().is_empty() {
                message.push_str(": ");
                message.push_str(stderr.trim());
            }
            return Err(NodeError::Process { exit_code, message });
        }

        Ok(())
    }
}

#[cfg(windows)]
fn shell(line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(line);
    cmd
}

#[cfg(not(windows))]
fn shell(line: &str) -> Command {
    let mut cmd = Command::new("bash");
    cmd.arg("-lc").arg(line);
    cmd
}

fn is_python_command(command: &str) -> bool {
    let c = command.trim().to_lowercase();
    c == "python" || c == "python3" || c.starts_with("python ") || c.starts_with("python3 ")
}

async fn ensure_script_exists(script_path: &str) -> Result<(), NodeError> {
    if script_path.trim().is_empty() {
        return Err(NodeError::Configuration(
            "A local script path is required for python commands".into(),
        ));
    }

    let is_file = tokio::fs::metadata(unquote(script_path))
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);

    if !is_file {
        return Err(NodeError::Configuration(format!(
            "Script not found at the given path: {}",
            script_path
        )));
    }
    Ok(())
}

/// Prepend the quoted script path for python commands unless `args` already
/// names it, then append the payload argument when applicable.
fn build_args(python: bool, script_path: &str, args: &str, vars: &ExecutionContext) -> String {
    let mut out = args.trim().to_string();

    if !python {
        return out;
    }

    if !script_path.trim().is_empty() {
        let quoted = quote(script_path);
        if out.is_empty() {
            out = quoted;
        } else if !mentions_path(&out, script_path) {
            out = format!("{} {}", quoted, out);
        }
    }

    let payload = vars
        .get(keys::PAYLOAD)
        .map(|v| v.to_string())
        .filter(|p| !p.trim().is_empty());

    match payload {
        Some(payload) if !template::has_markers(&out) => {
            let arg = format!("\"{}\"", payload.replace('"', "\\\""));
            if out.is_empty() {
                arg
            } else {
                format!("{} {}", out, arg)
            }
        }
        _ => out,
    }
}

/// Compare with slash direction and case normalized
fn mentions_path(args: &str, path: &str) -> bool {
    let normalize = |s: &str| s.replace('\\', "/").to_lowercase();
    normalize(args).contains(&normalize(path.trim()))
}

fn quote(value: &str) -> String {
    let v = value.trim();
    if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
        return v.to_string();
    }
    format!("\"{}\"", v.replace('"', "\\\""))
}

fn unquote(value: &str) -> &str {
    let v = value.trim();
    if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
        &v[1..v.len() - 1]
    } else {
        v
    }
}

pub struct CommandNodeFactory;

impl NodeFactory for CommandNodeFactory {
    fn create(&self) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(CommandNode))
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Command
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Run a shell command with {{variable}} templating".to_string(),
            category: "process".to_string(),
            config_keys: vec![
                ConfigKey::required("command", "Program or command line"),
                ConfigKey::optional("args", "Arguments appended after the command"),
                ConfigKey::optional("scriptPath", "Script file, required for python commands"),
                ConfigKey::optional("outputKey", "Variable receiving stdout"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_detection() {
        assert!(is_python_command("python"));
        assert!(is_python_command(" Python3 -u"));
        assert!(!is_python_command("pythonista"));
        assert!(!is_python_command("echo python"));
    }

    #[test]
    fn test_script_path_is_prepended_once() {
        let vars = ExecutionContext::new();
        assert_eq!(build_args(true, "/tmp/a.py", "", &vars), "\"/tmp/a.py\"");
        assert_eq!(build_args(true, "/tmp/a.py", "--x 1", &vars), "\"/tmp/a.py\" --x 1");
        assert_eq!(
            build_args(true, "C:\\Work\\A.py", "c:/work/a.py --x", &vars),
            "c:/work/a.py --x"
        );
    }

    #[test]
    fn test_payload_argument() {
        let mut vars = ExecutionContext::new();
        vars.set(keys::PAYLOAD, r#"{"k": "v"}"#);

        assert_eq!(
            build_args(true, "s.py", "", &vars),
            r#""s.py" "{\"k\": \"v\"}""#
        );
        // unresolved markers suppress the payload
        assert_eq!(build_args(true, "s.py", "{{ bad-name }}", &vars), "\"s.py\" {{ bad-name }}");
        // only python commands receive it
        assert_eq!(build_args(false, "", "x", &vars), "x");
    }
}
