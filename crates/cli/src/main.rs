use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gantry_core::pipeline::{Pipeline, PipelineConfig};

mod commands;

/// Gantry - A task-based build pipeline for module projects
#[derive(Parser)]
#[command(name = "gantry")]
#[command(about = "A task-based build pipeline for module projects")]
#[command(version)]
struct Cli {
    /// Path to the project root (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    project: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task and its prerequisites
    Run {
        /// Target task name; `.` runs the full pipeline
        #[arg(default_value = ".")]
        target: String,
    },
    /// Show the execution plan for a task without running it
    Plan {
        /// Target task name; `.` plans the full pipeline
        #[arg(default_value = ".")]
        target: String,
    },
    /// List registered tasks
    List,
    /// Show the task dependency graph
    Graph,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the pipeline with all business logic
    let pipeline = Pipeline::new(PipelineConfig {
        project_root: cli.project,
    })
    .map_err(|e| anyhow::anyhow!("Failed to initialize pipeline: {}", e))?;

    // No subcommand runs the full pipeline
    let command = cli.command.unwrap_or(Commands::Run {
        target: ".".to_string(),
    });

    // Execute command (CLI layer only handles presentation)
    match command {
        Commands::Run { target } => commands::run::execute(&pipeline, &target).await,
        Commands::Plan { target } => commands::plan::execute(&pipeline, &target),
        Commands::List => commands::list::execute(&pipeline),
        Commands::Graph => commands::graph::execute(&pipeline),
    }
}
