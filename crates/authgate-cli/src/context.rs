//! Per-invocation wiring: the session file, the cookie file and the client.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use authgate::{ApiUrl, AuthClient, AuthConfig, FileStorage, HttpTransport, SessionStore};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cli::GlobalArgs;
use crate::navigator::TerminalNavigator;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Transport cookies kept between invocations, keyed by path scope.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredCookies {
    api: String,
    scopes: BTreeMap<String, String>,
}

/// Get the data directory, creating it if needed.
fn data_dir() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "authgate").context("Could not determine data directory")?;

    let data_dir = dirs.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data directory")?;

    Ok(data_dir.to_path_buf())
}

/// Open the persisted session.
pub fn open_store() -> Result<Arc<SessionStore>> {
    let path = data_dir()?.join("session.json");
    Ok(Arc::new(SessionStore::init(Arc::new(FileStorage::new(path)))))
}

fn load_config(global: &GlobalArgs) -> Result<AuthConfig> {
    match &global.config {
        Some(path) => AuthConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(AuthConfig::default()),
    }
}

/// Path scopes probed when saving cookies: the root, the refresh endpoint's
/// directory, and the refresh endpoint itself.
fn cookie_scopes(refresh_path: &str) -> Vec<String> {
    let mut scopes = vec!["/".to_string()];
    if let Some((dir, _)) = refresh_path.rsplit_once('/')
        && !dir.is_empty()
    {
        scopes.push(dir.to_string());
    }
    scopes.push(refresh_path.to_string());
    scopes.dedup();
    scopes
}

/// Everything a network command needs.
pub struct Context {
    pub client: AuthClient,
    transport: Arc<HttpTransport>,
    cookie_file: PathBuf,
}

impl Context {
    /// Restore the session and cookies and build a client.
    pub fn open(global: &GlobalArgs) -> Result<Self> {
        let api = global
            .api
            .as_deref()
            .context("No API URL. Pass --api or set AUTHGATE_API.")?;
        let api = ApiUrl::new(api).context("Invalid API URL")?;
        let config = load_config(global)?;

        let transport = Arc::new(HttpTransport::new(api).context("Failed to create HTTP client")?);
        let cookie_file = data_dir()?.join("cookies.json");
        restore_cookies(&transport, &cookie_file)?;

        let client = AuthClient::new(
            config,
            transport.clone(),
            open_store()?,
            Arc::new(TerminalNavigator),
        )
        .context("Invalid configuration")?;

        Ok(Self {
            client,
            transport,
            cookie_file,
        })
    }

    /// Write the transport cookies back to disk.
    pub fn save(&self) -> Result<()> {
        let mut stored = StoredCookies {
            api: self.transport.api().to_string(),
            scopes: BTreeMap::new(),
        };

        let mut seen = HashSet::new();
        for scope in cookie_scopes(&self.client.config().refresh_path) {
            let Some(header) = self.transport.export_cookies(&scope) else {
                continue;
            };
            let fresh: Vec<String> = header
                .split(';')
                .map(str::trim)
                .filter(|c| !c.is_empty() && seen.insert(c.to_string()))
                .map(str::to_string)
                .collect();
            if !fresh.is_empty() {
                stored.scopes.insert(scope, fresh.join("; "));
            }
        }

        write_private(&self.cookie_file, &serde_json::to_string_pretty(&stored)?)
            .context("Failed to write cookie file")?;
        debug!(scopes = stored.scopes.len(), "Saved cookies");
        Ok(())
    }

    /// Forget the transport cookies.
    pub fn clear(&self) -> Result<()> {
        if self.cookie_file.exists() {
            fs::remove_file(&self.cookie_file).context("Failed to remove cookie file")?;
        }
        Ok(())
    }
}

fn restore_cookies(transport: &HttpTransport, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let json = fs::read_to_string(path).context("Failed to read cookie file")?;
    let stored: StoredCookies = match serde_json::from_str(&json) {
        Ok(stored) => stored,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable cookie file");
            return Ok(());
        }
    };
    if stored.api != transport.api().as_str() {
        warn!(stored = %stored.api, current = %transport.api(), "Ignoring cookies saved for another API");
        return Ok(());
    }

    for (scope, header) in &stored.scopes {
        transport
            .import_cookies(scope, header)
            .with_context(|| format!("Invalid cookie scope {}", scope))?;
    }
    Ok(())
}

fn write_private(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)?;

    // Set restrictive permissions (Unix only)
    #[cfg(unix)]
    {
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)?;
    }

    Ok(())
}
