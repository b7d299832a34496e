//! Visit command implementation.

use std::sync::Arc;

use anyhow::{Result, bail};
use authgate::{Navigation, NavigationGuard, RouteTable, Router};
use clap::Args;

use crate::context;
use crate::navigator::TerminalNavigator;
use crate::output;

#[derive(Args, Debug)]
pub struct VisitArgs {
    /// View name (Index, Stream, Login) or path (/, /stream, /login)
    pub view: String,
}

/// Runs the route guard against the stored session; no request is sent.
pub fn run(args: VisitArgs) -> Result<()> {
    let store = context::open_store()?;
    let router = Router::new(
        RouteTable::camera_app(),
        NavigationGuard::new(store),
        Arc::new(TerminalNavigator),
    );

    let landed = if args.view.starts_with('/') {
        router.push_path(&args.view)?
    } else {
        router.push(&args.view)?
    };

    match landed {
        Navigation::View { name } => {
            output::success(&format!("Entered {}", name));
            Ok(())
        }
        Navigation::Login { .. } => {
            bail!("{} requires a session. Run 'authgate session login' first.", args.view)
        }
    }
}
