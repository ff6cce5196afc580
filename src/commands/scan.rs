use anyhow::Result;

use crate::commands::CommandReport;
use crate::sync::config::load_config;
use crate::sync::paths::resolve_paths;
use crate::sync::recordings;

/// Offline inspection of the recordings directory: which files parse under
/// the configured naming convention and zone, and which are skipped.
pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths)?;
    let mut report = CommandReport::new("scan");

    report.detail(format!("recordings_dir={}", cfg.recordings.dir.display()));
    report.detail(format!("timezone={}", cfg.recordings.timezone));

    let out = recordings::list_candidates(&cfg.recordings)?;
    for recording in &out.recordings {
        report.detail(format!(
            "candidate file={} captured_at={}",
            recording.path.display(),
            recording.captured_at.to_rfc3339()
        ));
    }
    for path in &out.skipped {
        report.detail(format!("skipped file={} reason=unparsable", path.display()));
    }
    report.detail(format!(
        "candidates={} skipped={}",
        out.recordings.len(),
        out.skipped.len()
    ));

    Ok(report)
}
