//! Session subcommand implementations.

mod login;
mod logout;
mod refresh;
mod whoami;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::GlobalArgs;

#[derive(Args, Debug)]
pub struct SessionCommand {
    #[command(subcommand)]
    pub command: SessionSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum SessionSubcommand {
    /// Sign in with email and password
    Login(login::LoginArgs),

    /// Display the stored session
    Whoami(whoami::WhoamiArgs),

    /// Refresh the credential now
    Refresh(refresh::RefreshArgs),

    /// Sign out and clear the stored session
    Logout(logout::LogoutArgs),
}

pub async fn handle(cmd: SessionCommand, global: &GlobalArgs) -> Result<()> {
    match cmd.command {
        SessionSubcommand::Login(args) => login::run(args, global).await,
        SessionSubcommand::Whoami(args) => whoami::run(args),
        SessionSubcommand::Refresh(args) => refresh::run(args, global).await,
        SessionSubcommand::Logout(args) => logout::run(args, global).await,
    }
}
