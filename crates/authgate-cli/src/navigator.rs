//! Renders navigation commands on the terminal.

use authgate::{Navigation, Navigator};
use colored::Colorize;

/// Prints where the session logic sends the user.
///
/// There are no views to render in a terminal, so a login redirect becomes
/// a hint to sign in again, with the reason when there is one.
#[derive(Debug, Default)]
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, to: Navigation) {
        match &to {
            Navigation::Login {
                reason: Some(reason),
            } => {
                eprintln!(
                    "{} {} [{} {}]",
                    "→".cyan(),
                    reason.message(),
                    reason.code(),
                    reason.as_str().dimmed()
                );
                eprintln!("  Run 'authgate session login' to sign in again.");
            }
            Navigation::Login { reason: None } => {
                eprintln!("{} {}", "→".cyan(), "login".bold());
            }
            Navigation::View { name } => {
                eprintln!("{} {}", "→".cyan(), name.bold());
            }
        }
    }
}
