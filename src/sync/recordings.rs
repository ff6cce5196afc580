use crate::sync::config::RecordingsConfig;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::fs;
use std::path::{Path, PathBuf};

/// One candidate capture file. The capture start is parsed from the filename
/// and normalized from the configured file-naming zone to UTC at index time,
/// so the matcher only ever compares absolute instants.
#[derive(Debug, Clone)]
pub struct LocalRecording {
    pub path: PathBuf,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub recordings: Vec<LocalRecording>,
    pub skipped: Vec<PathBuf>,
}

/// Width in characters of a timestamp rendered under `format`. Capture
/// software appends a free-form suffix (scene name, game) after the stamp,
/// so parsing only looks at this fixed-width prefix of the file stem.
fn timestamp_width(format: &str) -> usize {
    let probe = NaiveDate::from_ymd_opt(2000, 11, 22)
        .and_then(|d| d.and_hms_opt(10, 20, 30))
        .map(|dt| dt.format(format).to_string())
        .unwrap_or_default();
    probe.chars().count()
}

pub fn parse_capture_instant(file_stem: &str, format: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let width = timestamp_width(format);
    if width == 0 {
        return None;
    }
    let prefix: String = file_stem.chars().take(width).collect();
    let naive = NaiveDateTime::parse_from_str(&prefix, format).ok()?;
    // A DST fold maps one wall-clock time to two instants; take the earlier.
    // Times inside a DST gap have no instant and are skipped like any other
    // unparsable name.
    let local = tz.from_local_datetime(&naive).earliest()?;
    Some(local.with_timezone(&Utc))
}

fn has_expected_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|v| v.to_str()) else {
        return false;
    };
    let ext = ext.to_ascii_lowercase();
    extensions.iter().any(|want| *want == ext)
}

/// List candidate recordings in the configured directory. Filenames that do
/// not carry a parsable timestamp are collected as skipped, never treated as
/// errors. The listing is name-sorted so "first match wins" is deterministic
/// across filesystems.
pub fn list_candidates(cfg: &RecordingsConfig) -> Result<ScanOutcome> {
    let entries = fs::read_dir(&cfg.dir)
        .with_context(|| format!("failed to read recordings dir {}", cfg.dir.display()))?;

    let mut out = ScanOutcome::default();
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && has_expected_extension(&path, &cfg.extensions) {
            files.push(path);
        }
    }
    files.sort();

    for path in files {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        match parse_capture_instant(stem, &cfg.filename_format, cfg.timezone) {
            Some(captured_at) => out.recordings.push(LocalRecording { path, captured_at }),
            None => out.skipped.push(path),
        }
    }

    Ok(out)
}
