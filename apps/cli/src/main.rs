//! Drivecord command-line entry point.

mod app;
mod cli;
mod config;

use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();
    let config_path = match cli.config.clone() {
        Some(path) => path,
        None => config::default_path(),
    };

    let config = config::Config::load(&config_path)?;
    tracing::debug!(path = %config_path.display(), "configuration loaded");
    config.warn_if_incomplete();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(cli.command, config, config_path))
}
