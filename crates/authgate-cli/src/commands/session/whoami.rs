//! Whoami command implementation.

use anyhow::{Context as _, Result};
use clap::Args;

use crate::context;
use crate::output;

#[derive(Args, Debug)]
pub struct WhoamiArgs {
    /// Print the session record as JSON
    #[arg(long)]
    pub json: bool,
}

/// Reads the stored session only; no request is sent.
pub fn run(args: WhoamiArgs) -> Result<()> {
    let store = context::open_store()?;

    if args.json {
        return output::json_pretty(&store.record());
    }

    let identity = store
        .identity()
        .context("No active session. Run 'authgate session login' first.")?;
    output::field("User", identity.user_id().as_str());
    output::field("Email", identity.display_email());

    Ok(())
}
