//! `zkp` command-line entry point

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use zkp_cli::{run, Cli};

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    Ok(if run(cli)? {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
