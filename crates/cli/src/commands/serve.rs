//! Serve Command
//!
//! Starts the suite server and keeps it in the foreground, for working
//! against the suite in a real browser.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::info;

use headspec_core::server::{self, ServerKind, ServerSupervisor};
use headspec_core::{RunOptions, ServerChoice};

#[derive(Args)]
pub struct ServeArgs {
    /// YAML options file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Suite server (auto, none, thin, mongrel, webrick, unicorn or a task name)
    #[arg(long)]
    pub server: Option<String>,

    /// Suite server port
    #[arg(long)]
    pub port: Option<u16>,

    /// Let the server child inherit stdio
    #[arg(long)]
    pub server_verbose: bool,
}

pub async fn execute(args: ServeArgs) -> anyhow::Result<()> {
    let mut options = match &args.config {
        Some(path) => RunOptions::load(path)
            .with_context(|| format!("Failed to load options from {}", path.display()))?,
        None => RunOptions::default(),
    };
    if let Some(server) = &args.server {
        options.server = ServerChoice::parse(server);
    }
    if let Some(port) = args.port {
        options.port = port;
    }
    if args.server_verbose {
        options.server_verbose = true;
    }

    let kind = server::resolve(&options.server, &options.spec_dir);
    if matches!(kind, ServerKind::None) {
        anyhow::bail!("No suite server to run; pass --server or add a config.ru");
    }

    let mut supervisor = ServerSupervisor::new(kind);
    supervisor
        .start(&options)
        .await
        .context("Suite server failed to become ready")?;
    info!(
        "Suite server listening on port {} (Ctrl-C to stop)",
        options.port
    );

    tokio::signal::ctrl_c().await?;
    supervisor.stop()?;
    Ok(())
}
