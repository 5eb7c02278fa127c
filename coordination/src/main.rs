//! Operator CLI for the executive coordination engine
//!
//! # Usage
//!
//! ```bash
//! # Coordinate one scenario against the router in ROUTER_URL
//! exec-coordination run --scenario-type financial --pattern consensus \
//!     --description "Raise list prices 8%?" --fact region=emea
//!
//! # Inspect the configured roster and fabric
//! exec-coordination roster --config exec.toml
//! exec-coordination topology --config exec.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;

use executive_coordination::{
    ConfigFile, EventBus, ExecutiveEngine, FabricMetrics, HttpResponseGenerator, NodeId, Roster,
    Scenario, ScenarioContext, SessionPriority, WARNING_UTILIZATION,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (.toml, .yaml, .yml or .json); defaults plus EXEC_* env otherwise
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Coordinate one scenario and print the result as JSON
    Run(RunArgs),
    /// Print the executive roster
    Roster,
    /// Print the fabric summary, idle utilization and per-node load bands
    Topology,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Scenario id; a fresh UUID when omitted
    #[arg(long)]
    id: Option<String>,

    /// Scenario category, e.g. financial, crisis, technical
    #[arg(long, default_value = "general")]
    scenario_type: String,

    #[arg(long)]
    description: String,

    /// parallel, sequential, consensus or hierarchical
    #[arg(long, default_value = "consensus")]
    pattern: String,

    /// low, medium, high or critical
    #[arg(long, default_value_t = SessionPriority::Medium)]
    priority: SessionPriority,

    /// Comma-separated participant ids; the whole roster when omitted
    #[arg(long, value_delimiter = ',')]
    participants: Vec<String>,

    /// Background fact as key=value; repeatable. JSON values are parsed.
    #[arg(long = "fact", value_parser = parse_fact)]
    facts: Vec<(String, serde_json::Value)>,

    /// Overrides the router URL from config and ROUTER_URL
    #[arg(long)]
    router_url: Option<String>,

    /// Abort the whole coordination after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print coordination events to stderr as they happen
    #[arg(long, default_value_t = false)]
    events: bool,
}

fn parse_fact(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn load_config(path: Option<&PathBuf>) -> Result<ConfigFile> {
    let mut file = match path {
        Some(path) => ConfigFile::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ConfigFile::default(),
    };
    file.engine = file.engine.with_overrides(|key| std::env::var(key).ok());
    Ok(file)
}

async fn run(mut file: ConfigFile, args: RunArgs) -> Result<()> {
    if let Some(url) = args.router_url {
        file.engine.router_url = url;
    }

    let generator = Arc::new(HttpResponseGenerator::new(file.engine.http_generator())?);
    let mut engine = ExecutiveEngine::from_config_file(&file, generator)?;

    if args.events {
        let bus = EventBus::new().shared();
        let mut receiver = bus.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = receiver.recv().await {
                if let Ok(line) = serde_json::to_string(&event) {
                    eprintln!("{}", line);
                }
            }
        });
        engine = engine.with_event_bus(bus);
    }

    let id = args
        .id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let scenario = Scenario::new(id, args.scenario_type, args.description, args.pattern)
        .with_priority(args.priority)
        .with_participants(args.participants);
    let context = args
        .facts
        .into_iter()
        .fold(ScenarioContext::new(), |ctx, (key, value)| ctx.with(key, value));

    let result = match args.timeout_secs {
        Some(secs) => {
            engine
                .coordinate_with_timeout(&scenario, context, Duration::from_secs(secs))
                .await?
        }
        None => engine.coordinate(&scenario, context).await?,
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("executive_coordination=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let file = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Run(args) => run(file, args).await?,
        Command::Roster => {
            let roster = Roster::from_directory(&file.directory())?;
            println!("{}", serde_json::to_string_pretty(roster.workloads())?);
        }
        Command::Topology => {
            let topology = file.topology.build()?;
            let idle: Vec<(f64, Vec<NodeId>)> = Vec::new();
            let metrics = FabricMetrics::compute(&topology, idle);
            let report = json!({
                "summary": topology.summary(),
                "load_levels": metrics.load_levels(),
                "saturated_nodes": metrics.saturated_nodes(WARNING_UTILIZATION),
                "metrics": metrics,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
