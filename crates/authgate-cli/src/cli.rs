//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::commands::api::ApiCommand;
use crate::commands::session::SessionCommand;
use crate::commands::visit::VisitArgs;

/// Drive an authgate session against a backend API.
#[derive(Parser, Debug)]
#[command(name = "authgate")]
#[command(author, version = env!("AUTHGATE_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// API base URL, e.g. https://cam.example.com
    #[arg(long, env = "AUTHGATE_API", global = true)]
    pub api: Option<String>,

    /// JSON file overriding endpoint paths, status codes and timeouts
    #[arg(long, env = "AUTHGATE_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in, inspect, refresh or end the stored session
    Session(SessionCommand),

    /// Send authenticated requests
    Api(ApiCommand),

    /// Navigate to a view through the route guard
    Visit(VisitArgs),
}
