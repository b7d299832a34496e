//! Logout command implementation.

use anyhow::Result;
use clap::Args;

use crate::cli::GlobalArgs;
use crate::context::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub async fn run(_args: LogoutArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = Context::open(global)?;

    let revoked = ctx.client.sign_out().await;
    ctx.clear()?;

    match revoked {
        Ok(()) => output::success("Logged out"),
        Err(e) => output::warning(&format!(
            "Logged out locally, but the server did not confirm: {}",
            e
        )),
    }

    Ok(())
}
