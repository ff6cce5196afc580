use crate::error::SyncError;
use crate::sync::paths::SyncPaths;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted record of which VOD ids have already been uploaded. The file is
/// a pretty-printed JSON array of id strings: trivial, human-inspectable, and
/// rewritten whole on every append. Identifiers are never removed.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    entries: Vec<String>,
}

fn read_entries(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: Vec<String> = serde_json::from_str(&raw).map_err(|err| {
        SyncError::Parse(format!("malformed ledger {}: {err}", path.display()))
    })?;
    Ok(parsed)
}

fn write_entries(path: &Path, entries: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(entries)?;
    fs::write(path, format!("{data}\n"))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

impl Ledger {
    /// Load the persisted ledger; a missing file is an empty ledger, a
    /// malformed file is a fatal parse error.
    pub fn load(paths: &SyncPaths) -> Result<Self> {
        let path = paths.ledger_file.clone();
        let entries = read_entries(&path)?;
        Ok(Self { path, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Membership stays correct even if a crashed run left duplicates behind.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|entry| entry == id)
    }

    /// Record a completed upload. Reloads the on-disk state first, so an id
    /// appended by an interrupted earlier run is not lost, de-duplicates, and
    /// persists the full sequence back immediately.
    pub fn append(&mut self, id: &str) -> Result<()> {
        let mut entries = read_entries(&self.path)?;
        if !entries.iter().any(|entry| entry == id) {
            entries.push(id.to_string());
        }
        write_entries(&self.path, &entries)?;
        self.entries = entries;
        Ok(())
    }
}
