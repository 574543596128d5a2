//! # neuromap CLI
//!
//! Generates, bounds and inspects the synaptic blocks of a distance-dependent
//! projection described by a TOML file.

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use neuromap_cli::NeuromapCli;

fn main() {
    let cli = NeuromapCli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout carries command output, so logs go to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(err) = cli.execute() {
        error!("Command failed: {}", err);
        std::process::exit(1);
    }
}
