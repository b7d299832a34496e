use std::path::Path;
use std::process::{Command, Output};

/// Run the CLI against `api` with a custom HOME for isolated session storage.
pub fn run_cli(args: &[&str], home: &Path, api: &str) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_authgate"));
    cmd.args(args);
    cmd.env("HOME", home);
    cmd.env("XDG_DATA_HOME", home.join("data"));
    cmd.env("AUTHGATE_API", api);
    cmd.env_remove("AUTHGATE_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd.output().expect("Failed to execute CLI")
}

/// Run the CLI and expect success. Returns stdout.
pub fn run_cli_success(args: &[&str], home: &Path, api: &str) -> String {
    let output = run_cli(args, home, api);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Run the CLI and expect failure. Returns stderr.
pub fn run_cli_failure(args: &[&str], home: &Path, api: &str) -> String {
    let output = run_cli(args, home, api);
    if output.status.success() {
        panic!("CLI command should have failed: {:?}", args);
    }
    String::from_utf8_lossy(&output.stderr).to_string()
}
