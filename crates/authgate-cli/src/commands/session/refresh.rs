//! Refresh command implementation.

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;

use crate::cli::GlobalArgs;
use crate::context::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct RefreshArgs {}

pub async fn run(_args: RefreshArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = Context::open(global)?;

    eprintln!("{}", "Refreshing session...".dimmed());

    let refreshed = ctx.client.refresh().await;
    ctx.save().context("Failed to save cookies")?;
    let identity = refreshed.context("Failed to refresh session")?;

    output::success("Session refreshed successfully");
    output::field("User", identity.user_id().as_str());

    Ok(())
}
