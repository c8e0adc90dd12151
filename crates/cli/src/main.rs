// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aether: command-line orchestrator for FHIR data-use pipelines.

mod commands;
mod config_file;
mod exit_error;
mod output;
mod progress;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aether", version, about = "Drive FHIR data through import, pseudonymization and conversion")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Create and drive pipeline runs
    Pipeline(commands::pipeline::PipelineArgs),
    /// Inspect jobs and run single steps
    Job(commands::job::JobArgs),
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Pipeline(args) => commands::pipeline::run(args).await,
        Command::Job(args) => commands::job::run(args).await,
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(err.code);
    }
}
