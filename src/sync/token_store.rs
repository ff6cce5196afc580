use crate::error::SyncError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Persisted YouTube user credential. The refresh token is long-lived; the
/// access token is rewritten on every refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at_epoch_secs: u64,
}

/// Storage seam for the credential blob, so the backend can move off a plain
/// file without touching the uploader.
pub trait CredentialStore {
    fn load(&self) -> Result<Option<StoredToken>>;
    fn save(&self, token: &StoredToken) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<StoredToken>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let parsed: StoredToken = serde_json::from_str(&raw).map_err(|err| {
            SyncError::Parse(format!(
                "malformed token store {}: {err}",
                self.path.display()
            ))
        })?;
        Ok(Some(parsed))
    }

    fn save(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(token)?;
        fs::write(&self.path, format!("{data}\n"))
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_store_loads_as_none() {
        let tmp = tempdir().expect("tempdir");
        let store = FileCredentialStore::new(tmp.path().join("token.json"));
        assert!(store.load().expect("load").is_none());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let tmp = tempdir().expect("tempdir");
        let store = FileCredentialStore::new(tmp.path().join("token.json"));
        store
            .save(&StoredToken {
                access_token: "at".to_string(),
                refresh_token: "rt".to_string(),
                expires_at_epoch_secs: 1_700_000_000,
            })
            .expect("save");

        let got = store.load().expect("load").expect("some");
        assert_eq!(got.refresh_token, "rt");
        assert_eq!(got.expires_at_epoch_secs, 1_700_000_000);
    }

    #[test]
    fn malformed_store_is_a_parse_error() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("token.json");
        fs::write(&path, "nope").expect("seed");
        let store = FileCredentialStore::new(path);
        let err = store.load().expect_err("malformed");
        assert!(err.to_string().contains("malformed token store"));
    }
}
