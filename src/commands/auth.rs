use anyhow::{Context, Result};
use std::io::{self, Write};

use crate::commands::CommandReport;
use crate::error::SyncError;
use crate::sync::config::load_config;
use crate::sync::paths::resolve_paths;
use crate::sync::token_store::{CredentialStore, FileCredentialStore};
use crate::sync::youtube;

/// One-time YouTube OAuth bootstrap: print the consent URL, read the
/// authorization code from stdin, exchange it, and persist the credential.
pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths)?;
    let mut report = CommandReport::new("auth");

    let secret = youtube::load_client_secret(&cfg.youtube.client_secret_path)?;

    println!("Open this URL in a browser and grant upload access:");
    println!("  {}", youtube::consent_url(&secret));
    print!("Paste the authorization code: ");
    io::stdout().flush()?;

    let mut code = String::new();
    io::stdin()
        .read_line(&mut code)
        .context("failed to read authorization code")?;
    if code.trim().is_empty() {
        return Err(SyncError::Auth("no authorization code entered".to_string()).into());
    }

    let token = youtube::exchange_authorization_code(&secret, &code)?;
    let store = FileCredentialStore::new(paths.token_file.clone());
    store.save(&token)?;

    report.detail(format!("token_store={}", paths.token_file.display()));
    report.detail("refresh token persisted; `vodsync run` can now upload");
    Ok(report)
}
