mod demo;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use weft_core::config::AppConfig;
use weft_core::observe::{LogObserver, NoopObserver, SpanObserver};
use weft_engine::orchestrator::{BusOrchestrator, GraphOrchestrator, RunOutcome};

#[derive(Parser)]
#[command(name = "weft", version, about = "Orchestration core for multi-step, multi-participant runs")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "weft.toml")]
    config: PathBuf,

    /// Emit a span for every dispatch, receive, and step
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the demo pipeline in message-bus mode
    Bus {
        /// The raw request
        #[arg(trailing_var_arg = true)]
        input: Vec<String>,
    },
    /// Run the demo pipeline in graph mode
    Graph {
        /// The raw request
        #[arg(trailing_var_arg = true)]
        input: Vec<String>,
    },
    /// Show current configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        AppConfig::load(&cli.config)?
    } else {
        AppConfig::default()
    };

    let observer: Arc<dyn SpanObserver> = if cli.verbose {
        Arc::new(LogObserver::new())
    } else {
        Arc::new(NoopObserver)
    };

    match cli.command {
        Commands::Bus { input } => {
            let input = join_input(input);
            let catalog = demo::Catalog::sample();
            let router = demo::travel_router(catalog).with_observer(observer.clone());
            let mut orchestrator =
                BusOrchestrator::from_config(router, &config.bus).with_observer(observer);
            report(orchestrator.run(input.as_str())?, cli.verbose);
        }
        Commands::Graph { input } => {
            let input = join_input(input);
            let catalog = demo::Catalog::sample();
            let graph = demo::travel_graph(catalog)?;
            // Config-declared fields win; otherwise seed the demo pipeline's.
            let declared = if config.graph.declared_fields.is_empty() {
                vec![
                    "duration".into(),
                    "constraints".into(),
                    "priority".into(),
                    "selected_places".into(),
                    "schedule".into(),
                    "final_output".into(),
                ]
            } else {
                config.graph.declared_fields.clone()
            };
            let orchestrator = GraphOrchestrator::from_config(graph, &config.graph)
                .with_declared_fields(declared)
                .with_observer(observer);
            report(orchestrator.run(&input)?, cli.verbose);
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn join_input(input: Vec<String>) -> String {
    if input.is_empty() {
        "two quiet days in Busan, minimize travel".to_string()
    } else {
        input.join(" ")
    }
}

fn report(outcome: RunOutcome, verbose: bool) {
    if verbose {
        for line in outcome.trace() {
            println!("{line}");
        }
        println!();
    }
    match outcome {
        RunOutcome::Complete { artifact, .. } => {
            info!("run complete");
            match artifact.as_str() {
                Some(text) => println!("{text}"),
                None => println!("{:#}", artifact),
            }
        }
        RunOutcome::NoResult { .. } => println!("no result produced"),
    }
}
