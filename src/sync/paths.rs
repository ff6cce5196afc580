use anyhow::Result;
use std::env;
use std::path::PathBuf;

/// All persisted state lives beside the config file under the sync home:
/// the upload ledger, the YouTube credential blob, and the audit log.
#[derive(Debug, Clone)]
pub struct SyncPaths {
    pub sync_home: PathBuf,
    pub config_file: PathBuf,
    pub ledger_file: PathBuf,
    pub token_file: PathBuf,
    pub lock_file: PathBuf,
    pub logs_dir: PathBuf,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<SyncPaths> {
    let home = required_home_dir()?;
    let sync_home = env_or_default_path("VODSYNC_HOME", home.join(".vodsync"));

    let config_file = env_or_default_path("VODSYNC_CONFIG_PATH", sync_home.join("config.toml"));
    let ledger_file = env_or_default_path("VODSYNC_LEDGER_PATH", sync_home.join("uploaded.json"));
    let token_file =
        env_or_default_path("VODSYNC_TOKEN_PATH", sync_home.join("youtube_token.json"));
    let lock_file = sync_home.join("run.lock");
    let logs_dir = env_or_default_path("VODSYNC_LOGS_DIR", sync_home.join("logs"));

    Ok(SyncPaths {
        sync_home,
        config_file,
        ledger_file,
        token_file,
        lock_file,
        logs_dir,
    })
}
