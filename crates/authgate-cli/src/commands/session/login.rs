//! Login command implementation.

use anyhow::{Context as _, Result};
use authgate::Credentials;
use clap::Args;
use colored::Colorize;

use crate::cli::GlobalArgs;
use crate::context::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email address
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long, env = "AUTHGATE_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn run(args: LoginArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = Context::open(global)?;
    let credentials = Credentials::new(&args.email, &args.password);

    eprintln!("{}", "Logging in...".dimmed());

    let identity = ctx
        .client
        .sign_in(credentials)
        .await
        .context("Failed to login")?;
    ctx.save().context("Failed to save session")?;

    output::success("Logged in successfully");
    println!();
    output::field("User", identity.user_id().as_str());
    output::field("Email", identity.display_email());

    Ok(())
}
