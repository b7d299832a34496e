//! authgate - CLI for driving an authgate session.
//!
//! Each invocation restores the session from disk, runs one command through
//! the library's client, and writes the session back. Useful for exercising
//! a backend's login, refresh and expiry behavior by hand.

mod cli;
mod commands;
mod context;
mod navigator;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use commands::{api, session, visit};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Session(cmd) => session::handle(cmd, &cli.global).await,
        Commands::Api(cmd) => api::handle(cmd, &cli.global).await,
        Commands::Visit(args) => visit::run(args),
    }
}

fn init_logging(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info,authgate=debug",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
