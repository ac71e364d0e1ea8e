//! Headspec CLI - Main Entry Point
//!
//! One-shot driver around the headspec core: run suites against a
//! supervised server, list spec files, or keep the suite server in the
//! foreground.

use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{list, run, serve};

/// Headspec - Headless browser suite driver
#[derive(Parser)]
#[command(name = "headspec")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run suites once and exit with the result
    Run(run::RunArgs),

    /// List the spec files under the spec directory
    List(list::ListArgs),

    /// Start the suite server and keep it in the foreground
    Serve(serve::ServeArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run(args) => match run::execute(args).await {
            Ok(true) => {}
            Ok(false) => std::process::exit(1),
            Err(err) => {
                eprintln!("Error: {}", err);
                std::process::exit(2);
            }
        },
        Commands::List(args) => list::execute(args)?,
        Commands::Serve(args) => serve::execute(args).await?,
    }

    Ok(())
}
