use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use fuschia_config::WorkflowDef;
use fuschia_node::NodeRegistry;
use fuschia_orchestrator::Orchestrator;
use fuschia_workflow::Workflow;

/// fuschia - a reactive workflow execution engine
#[derive(Parser)]
#[command(name = "fuschia")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.fuschia)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a workflow to completion once
  Run {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,
  },

  /// Start a workflow's trigger nodes so it runs itself on external events
  Start {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,
  },

  /// Stop a running workflow's trigger nodes
  Stop {
    /// The workflow id to stop
    workflow_id: String,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let _data_dir = cli.data_dir.unwrap_or_else(|| {
    dirs::home_dir()
      .expect("could not determine home directory")
      .join(".fuschia")
  });

  match cli.command {
    Some(Commands::Run { workflow_file }) => run_workflow(workflow_file)?,
    Some(Commands::Start { workflow_file }) => start_workflow(workflow_file)?,
    Some(Commands::Stop { workflow_id }) => stop_workflow(workflow_id)?,
    None => {
      println!("fuschia - use --help to see available commands");
    }
  }

  Ok(())
}

fn run_workflow(workflow_file: PathBuf) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run_workflow_async(workflow_file).await })
}

async fn run_workflow_async(workflow_file: PathBuf) -> Result<()> {
  let workflow = load_workflow(&workflow_file).await?;
  eprintln!("Loaded workflow: {} ({} nodes)", workflow.name, workflow.nodes.len());

  let trigger_data = read_payload_from_stdin()?;

  // Concrete node types are registered by the embedding application; the
  // core engine ships none of its own.
  let registry = Arc::new(NodeRegistry::new());
  let orchestrator = Orchestrator::new(registry);

  let result = orchestrator
    .execute_workflow(Arc::new(workflow), Some(trigger_data))
    .await
    .context("workflow execution failed")?;

  eprintln!("Execution {} finished with status {:?}", result.execution_id, result.status);
  if !result.errors.is_empty() {
    eprintln!("Errors: {:?}", result.errors);
  }

  let output: serde_json::Map<String, serde_json::Value> = result
    .node_results
    .into_iter()
    .map(|(id, r)| (id, serde_json::to_value(&r).unwrap_or(serde_json::Value::Null)))
    .collect();
  println!("{}", serde_json::to_string_pretty(&output)?);

  Ok(())
}

fn start_workflow(workflow_file: PathBuf) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    let workflow = load_workflow(&workflow_file).await?;
    let registry = Arc::new(NodeRegistry::new());
    let orchestrator = Orchestrator::new(registry);
    orchestrator
      .start_workflow(Arc::new(workflow))
      .await
      .context("failed to start workflow's trigger nodes")?;
    eprintln!("Trigger nodes started. This process must stay alive for them to keep watching for events.");
    Ok(())
  })
}

fn stop_workflow(workflow_id: String) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    let registry = Arc::new(NodeRegistry::new());
    let orchestrator = Orchestrator::new(registry);
    orchestrator
      .stop_workflow(&workflow_id)
      .await
      .context("failed to stop workflow's trigger nodes")?;
    Ok(())
  })
}

async fn load_workflow(workflow_file: &PathBuf) -> Result<Workflow> {
  let content = tokio::fs::read_to_string(workflow_file)
    .await
    .with_context(|| format!("failed to read workflow file: {}", workflow_file.display()))?;

  let def: WorkflowDef = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow file: {}", workflow_file.display()))?;

  Workflow::from_def(def).context("invalid workflow graph")
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, use empty object
    Ok(serde_json::json!({}))
  } else {
    // Read from stdin
    let mut input = String::new();
    io::stdin()
      .read_to_string(&mut input)
      .context("failed to read payload from stdin")?;

    if input.trim().is_empty() {
      Ok(serde_json::json!({}))
    } else {
      serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
    }
  }
}
