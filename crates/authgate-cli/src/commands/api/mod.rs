//! API subcommand implementations.

mod get;
mod post;

use anyhow::{Context as _, Result};
use authgate::ApiRequest;
use clap::{Args, Subcommand};

use crate::cli::GlobalArgs;
use crate::context::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct ApiCommand {
    #[command(subcommand)]
    pub command: ApiSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ApiSubcommand {
    /// Send a GET request
    Get(get::GetArgs),

    /// Send a POST request
    Post(post::PostArgs),
}

pub async fn handle(cmd: ApiCommand, global: &GlobalArgs) -> Result<()> {
    let request = match cmd.command {
        ApiSubcommand::Get(args) => get::request(args),
        ApiSubcommand::Post(args) => post::request(args)?,
    };
    send(request, global).await
}

/// Send through the client, keeping any cookies a refresh rotated even when
/// the request itself fails.
async fn send(request: ApiRequest, global: &GlobalArgs) -> Result<()> {
    let ctx = Context::open(global)?;
    let target = format!("{} {}", request.method(), request.path());

    let result = ctx.client.send(request).await;
    ctx.save().context("Failed to save cookies")?;

    let response = result.with_context(|| format!("{} failed", target))?;
    output::body(&response)
}
