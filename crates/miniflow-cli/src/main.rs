// crates/miniflow-cli/src/main.rs

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use miniflow_core::{Value, Workflow};
use miniflow_runtime::{validate, ExecutionResult, FlowRuntime, NodeRegistry, RuntimeConfig};
use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const SEPARATOR: &str = "======================";

#[derive(Parser)]
#[command(name = "miniflow")]
#[command(about = "Sequential workflow interpreter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow document
    Run {
        /// Path to the workflow JSON; read from stdin when omitted
        #[arg(short, long, env = "MINIFLOW_WORKFLOW")]
        file: Option<PathBuf>,

        /// Initial variables as a JSON object
        #[arg(short, long, env = "MINIFLOW_INPUT")]
        input: Option<String>,

        /// Debug logging
        #[arg(short, long)]
        verbose: bool,

        /// Only print the final status line
        #[arg(short, long, conflicts_with = "verbose")]
        quiet: bool,
    },

    /// Check a workflow document for structural problems
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// List available node types
    Nodes,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Run {
            file,
            input,
            verbose,
            quiet,
        } => {
            init_logging(log_level(verbose, quiet));
            run_workflow(file, input, quiet).await
        }
        Commands::Validate { file } => {
            init_logging("info");
            validate_workflow(file)
        }
        Commands::Nodes => {
            list_nodes();
            Ok(())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("CRITICAL_ERROR: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn log_level(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    }
}

/// Logs go to stderr so stdout carries only the run report. RUST_LOG wins
/// over the default level.
fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    miniflow_nodes::register_all(&mut registry);
    registry
}

fn read_document(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read workflow file {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Cannot read workflow from stdin")?;
            Ok(buf)
        }
    }
}

fn parse_inputs(input: Option<String>) -> Result<HashMap<String, Value>> {
    let Some(raw) = input.filter(|s| !s.trim().is_empty()) else {
        return Ok(HashMap::new());
    };

    match serde_json::from_str::<serde_json::Value>(&raw).context("Invalid input JSON")? {
        serde_json::Value::Object(obj) => Ok(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
        _ => bail!("Input must be a JSON object"),
    }
}

async fn run_workflow(file: Option<PathBuf>, input: Option<String>, quiet: bool) -> Result<()> {
    let document = read_document(file.as_ref())?;
    if document.trim().is_empty() {
        return Ok(());
    }

    let workflow = Workflow::from_json(&document).context("Invalid workflow document")?;
    let inputs = parse_inputs(input)?;

    tracing::info!(
        workflow = %workflow.display_name(),
        nodes = workflow.nodes.len(),
        inputs = inputs.len(),
        "Loaded workflow"
    );

    let runtime = FlowRuntime::with_registry(Arc::new(build_registry()), RuntimeConfig::default());

    if !quiet {
        println!("Ejecutando \"{}\":", workflow.display_name());
        println!("{}", SEPARATOR);
    }

    let result = runtime.execute(&workflow, inputs).await?;
    tracing::info!(
        execution_id = %result.execution_id,
        status = %result.status,
        executed = result.trace.len(),
        "Run finished"
    );

    if !quiet {
        print_trace(&result);
    }
    println!("{{\"status\": \"{}\"}}", result.status);

    Ok(())
}

fn print_trace(result: &ExecutionResult) {
    for entry in &result.trace {
        println!("{}", entry);
        println!("{}", SEPARATOR);
    }
    println!("=============");
    println!("Ejecución completada en {} ms", result.duration_ms);
}

fn validate_workflow(file: PathBuf) -> Result<()> {
    let document = read_document(Some(&file))?;
    let workflow = Workflow::from_json(&document).context("Invalid workflow document")?;

    let issues = validate(&workflow);
    tracing::debug!(issues = issues.len(), "Validated {}", file.display());
    if issues.is_empty() {
        println!(
            "Workflow \"{}\" is valid ({} nodes, {} edges)",
            workflow.display_name(),
            workflow.nodes.len(),
            workflow.edges.len()
        );
        return Ok(());
    }

    for issue in &issues {
        println!("- {}", issue);
    }
    bail!("{} validation issue(s) found", issues.len())
}

fn list_nodes() {
    let registry = build_registry();

    for kind in registry.list_node_types() {
        let Some(metadata) = registry.get_metadata(kind) else {
            println!("{}", kind);
            continue;
        };

        println!("{} ({})", kind, metadata.category);
        println!("    {}", metadata.description);
        for key in &metadata.config_keys {
            let marker = if key.required { "*" } else { " " };
            println!("    {} {:<14} {}", marker, key.name, key.description);
        }
    }
}
