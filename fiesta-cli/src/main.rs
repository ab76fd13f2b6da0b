//! Main entry point for the `fiesta` binary

mod commands;
mod config;

use clap::Parser;
use commands::EntryPoint;
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;
use yansi::Paint;

fn main() -> eyre::Result<()> {
    let entry = EntryPoint::parse();

    let default_level = if entry.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!entry.no_color && std::io::stderr().is_terminal())
        .init();

    if entry.no_color || !std::io::stdout().is_terminal() {
        Paint::disable();
    }

    entry.run()
}
