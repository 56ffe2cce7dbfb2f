//! Mimir - declarative pipeline orchestration core.
//!
//! Entry point wiring the context/plugin/pipeline/scheduler/queue/worker
//! crates into `run`, `schedule`, `worker`, and `serve` subcommands.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod pipelines;

use commands::{run, schedule, serve, worker, Context};

#[derive(Parser)]
#[command(name = "mimir")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose (debug) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output machine-readable JSON where applicable.
    #[arg(long, global = true)]
    pub json: bool,

    /// Project directory to look for `mimir.toml` in (defaults to cwd).
    #[arg(long, global = true)]
    pub project_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a single pipeline definition once.
    Run(run::RunArgs),

    /// Register or evaluate cron schedules.
    Schedule(schedule::ScheduleArgs),

    /// Drain a one-shot batch of work tasks.
    Worker(worker::WorkerArgs),

    /// Run the scheduler tick loop and worker pool as a long-lived process.
    Serve(serve::ServeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "mimir=debug,mimir_pipeline=debug,mimir_context=debug,mimir_plugin=debug,mimir_scheduler=debug,mimir_queue=debug,mimir_worker=debug,info"
    } else {
        "mimir=info,mimir_pipeline=info,mimir_scheduler=info,mimir_queue=info,mimir_worker=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let settings = config::load(cli.project_dir.as_deref())?;
    let ctx = Context {
        settings,
        json_output: cli.json,
    };

    match cli.command {
        Commands::Run(args) => run::run(args, &ctx).await,
        Commands::Schedule(args) => schedule::run(args, &ctx).await,
        Commands::Worker(args) => worker::run(args, &ctx).await,
        Commands::Serve(args) => serve::run(args, &ctx).await,
    }
}
