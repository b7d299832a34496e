//! Output formatting helpers.

use anyhow::Result;
use authgate::ApiResponse;
use colored::Colorize;
use serde::Serialize;

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning to stderr.
pub fn warning(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print a labeled field.
pub fn field(label: &str, value: &str) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print a value as pretty-printed JSON.
pub fn json_pretty<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Print a response body: pretty JSON when it parses, raw text otherwise.
pub fn body(response: &ApiResponse) -> Result<()> {
    match response.json::<serde_json::Value>() {
        Ok(value) => json_pretty(&value),
        Err(_) => {
            let text = response.text();
            if !text.is_empty() {
                println!("{}", text);
            }
            Ok(())
        }
    }
}
