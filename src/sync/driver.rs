use crate::sync::audit;
use crate::sync::ledger::Ledger;
use crate::sync::matcher::find_match;
use crate::sync::paths::SyncPaths;
use crate::sync::recordings::LocalRecording;
use crate::sync::twitch::ArchiveEntry;
use crate::sync::youtube::Uploader;
use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Apply,
    /// Report what would be uploaded without invoking the uploader or
    /// touching the ledger.
    DryRun,
}

/// Terminal state of one archive entry within a run.
#[derive(Debug, Clone)]
pub enum EntryOutcome {
    SkippedAlreadyUploaded,
    /// Not an error: the entry stays un-ledgered and is retried next run.
    NoLocalMatch,
    Uploaded {
        video_id: String,
        source: PathBuf,
    },
    WouldUpload {
        source: PathBuf,
    },
    /// Only reachable under keep-going; the entry stays un-ledgered.
    UploadFailed {
        error: String,
    },
}

#[derive(Debug, Clone)]
pub struct EntryReport {
    pub vod_id: String,
    pub title: String,
    pub outcome: EntryOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    pub reports: Vec<EntryReport>,
    pub uploaded: usize,
    /// Matches found under `RunMode::DryRun`; nothing was uploaded for these.
    pub would_upload: usize,
    pub skipped: usize,
    pub unmatched: usize,
    pub failed: usize,
}

/// Exclusive lock for the whole reconciliation run. Two concurrent runs would
/// race load-modify-persist on the ledger, so the second invocation fails
/// fast instead. Released on all exit paths via drop.
pub struct RunLock {
    file: fs::File,
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

pub fn acquire_run_lock(paths: &SyncPaths) -> Result<RunLock> {
    fs::create_dir_all(&paths.sync_home)
        .with_context(|| format!("failed to create {}", paths.sync_home.display()))?;
    let file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .open(&paths.lock_file)
        .with_context(|| format!("failed to open {}", paths.lock_file.display()))?;
    file.try_lock_exclusive().with_context(|| {
        format!(
            "another reconciliation run holds {}",
            paths.lock_file.display()
        )
    })?;
    Ok(RunLock { file })
}

/// Drive each entry through `Fetched → SkippedAlreadyUploaded | NoLocalMatch
/// | Uploaded`, in remote-API response order, one at a time.
///
/// The ledger check short-circuits before matching, and a successful upload
/// is ledgered immediately, so a crash mid-run never repeats completed work.
/// Upload failures abort the run unless `keep_going` isolates them per entry;
/// either way the failed entry stays un-ledgered and is retried in full on
/// the next run.
pub fn reconcile(
    paths: &SyncPaths,
    entries: &[ArchiveEntry],
    recordings: &[LocalRecording],
    ledger: &mut Ledger,
    uploader: &mut dyn Uploader,
    mode: RunMode,
    keep_going: bool,
) -> Result<ReconcileOutcome> {
    let mut out = ReconcileOutcome::default();

    for entry in entries {
        if ledger.contains(&entry.id) {
            out.skipped += 1;
            audit::append_event(
                paths,
                "entry",
                "skipped",
                &format!("vod={} reason=already-uploaded", entry.id),
            )?;
            out.reports.push(EntryReport {
                vod_id: entry.id.clone(),
                title: entry.title.clone(),
                outcome: EntryOutcome::SkippedAlreadyUploaded,
            });
            continue;
        }

        let Some(recording) = find_match(entry, recordings) else {
            out.unmatched += 1;
            audit::append_event(
                paths,
                "entry",
                "no-match",
                &format!(
                    "vod={} created_at={} candidates={}",
                    entry.id,
                    entry.created_at.to_rfc3339(),
                    recordings.len()
                ),
            )?;
            out.reports.push(EntryReport {
                vod_id: entry.id.clone(),
                title: entry.title.clone(),
                outcome: EntryOutcome::NoLocalMatch,
            });
            continue;
        };

        if mode == RunMode::DryRun {
            out.would_upload += 1;
            audit::append_event(
                paths,
                "entry",
                "dry-run",
                &format!("vod={} source={}", entry.id, recording.path.display()),
            )?;
            out.reports.push(EntryReport {
                vod_id: entry.id.clone(),
                title: entry.title.clone(),
                outcome: EntryOutcome::WouldUpload {
                    source: recording.path.clone(),
                },
            });
            continue;
        }

        match uploader.upload(&recording.path, &entry.title, &entry.id, &entry.category) {
            Ok(video_id) => {
                ledger.append(&entry.id).with_context(|| {
                    format!(
                        "upload of vod {} succeeded but the ledger could not be updated",
                        entry.id
                    )
                })?;
                out.uploaded += 1;
                audit::append_event(
                    paths,
                    "entry",
                    "uploaded",
                    &format!(
                        "vod={} video_id={} source={}",
                        entry.id,
                        video_id,
                        recording.path.display()
                    ),
                )?;
                out.reports.push(EntryReport {
                    vod_id: entry.id.clone(),
                    title: entry.title.clone(),
                    outcome: EntryOutcome::Uploaded {
                        video_id,
                        source: recording.path.clone(),
                    },
                });
            }
            Err(err) => {
                audit::append_event(
                    paths,
                    "entry",
                    "degraded",
                    &format!("vod={} error={err:#}", entry.id),
                )?;
                if !keep_going {
                    return Err(err.context(format!("upload of vod {} failed", entry.id)));
                }
                out.failed += 1;
                out.reports.push(EntryReport {
                    vod_id: entry.id.clone(),
                    title: entry.title.clone(),
                    outcome: EntryOutcome::UploadFailed {
                        error: format!("{err:#}"),
                    },
                });
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use chrono::{DateTime, Duration, Utc};
    use std::path::Path;
    use tempfile::tempdir;

    fn test_paths(root: &Path) -> SyncPaths {
        SyncPaths {
            sync_home: root.to_path_buf(),
            config_file: root.join("config.toml"),
            ledger_file: root.join("uploaded.json"),
            token_file: root.join("youtube_token.json"),
            lock_file: root.join("run.lock"),
            logs_dir: root.join("logs"),
        }
    }

    fn entry(id: &str, rfc3339: &str) -> ArchiveEntry {
        ArchiveEntry {
            id: id.to_string(),
            title: format!("stream {id}"),
            created_at: DateTime::parse_from_rfc3339(rfc3339)
                .expect("valid timestamp")
                .with_timezone(&Utc),
            category: "Just Chatting".to_string(),
        }
    }

    fn recording(name: &str, captured_at: DateTime<Utc>) -> LocalRecording {
        LocalRecording {
            path: PathBuf::from(name),
            captured_at,
        }
    }

    #[derive(Default)]
    struct FakeUploader {
        calls: Vec<(PathBuf, String, String, String)>,
        fail_on: Option<String>,
    }

    impl Uploader for FakeUploader {
        fn upload(
            &mut self,
            file: &Path,
            title: &str,
            vod_id: &str,
            category: &str,
        ) -> Result<String> {
            self.calls.push((
                file.to_path_buf(),
                title.to_string(),
                vod_id.to_string(),
                category.to_string(),
            ));
            if self.fail_on.as_deref() == Some(vod_id) {
                return Err(SyncError::Upload(format!("simulated failure for {vod_id}")).into());
            }
            Ok(format!("yt-{vod_id}"))
        }
    }

    #[test]
    fn matching_entry_is_uploaded_and_ledgered() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(tmp.path());
        let mut ledger = Ledger::load(&paths).expect("load");
        let mut uploader = FakeUploader::default();

        let entries = vec![entry("v1", "2024-01-01T10:00:00Z")];
        let recordings = vec![recording("2024-01-01 11-00-00 Game.mp4", entries[0].created_at)];

        let out = reconcile(
            &paths,
            &entries,
            &recordings,
            &mut ledger,
            &mut uploader,
            RunMode::Apply,
            false,
        )
        .expect("reconcile");

        assert_eq!(out.uploaded, 1);
        assert_eq!(uploader.calls.len(), 1);
        assert_eq!(uploader.calls[0].2, "v1");
        assert!(Ledger::load(&paths).expect("reload").contains("v1"));
    }

    #[test]
    fn ledgered_entry_short_circuits_without_uploader_call() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(tmp.path());
        let mut ledger = Ledger::load(&paths).expect("load");
        ledger.append("v1").expect("seed ledger");
        let mut uploader = FakeUploader::default();

        let entries = vec![entry("v1", "2024-01-01T10:00:00Z")];
        let recordings = vec![recording("match.mp4", entries[0].created_at)];

        let out = reconcile(
            &paths,
            &entries,
            &recordings,
            &mut ledger,
            &mut uploader,
            RunMode::Apply,
            false,
        )
        .expect("reconcile");

        assert_eq!(out.skipped, 1);
        assert!(uploader.calls.is_empty());
    }

    #[test]
    fn unmatched_entry_leaves_ledger_untouched() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(tmp.path());
        let mut ledger = Ledger::load(&paths).expect("load");
        let mut uploader = FakeUploader::default();

        let entries = vec![entry("v1", "2024-01-01T10:00:00Z")];
        let recordings = vec![recording(
            "far.mp4",
            entries[0].created_at + Duration::hours(2),
        )];

        let out = reconcile(
            &paths,
            &entries,
            &recordings,
            &mut ledger,
            &mut uploader,
            RunMode::Apply,
            false,
        )
        .expect("reconcile");

        assert_eq!(out.unmatched, 1);
        assert!(uploader.calls.is_empty());
        assert!(Ledger::load(&paths).expect("reload").is_empty());
    }

    #[test]
    fn upload_failure_aborts_run_and_leaves_entry_unledgered() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(tmp.path());
        let mut ledger = Ledger::load(&paths).expect("load");
        let mut uploader = FakeUploader {
            fail_on: Some("v1".to_string()),
            ..FakeUploader::default()
        };

        let entries = vec![
            entry("v1", "2024-01-01T10:00:00Z"),
            entry("v2", "2024-01-02T10:00:00Z"),
        ];
        let recordings = vec![
            recording("a.mp4", entries[0].created_at),
            recording("b.mp4", entries[1].created_at),
        ];

        let err = reconcile(
            &paths,
            &entries,
            &recordings,
            &mut ledger,
            &mut uploader,
            RunMode::Apply,
            false,
        )
        .expect_err("fail fast");

        assert!(err.to_string().contains("upload of vod v1 failed"));
        assert_eq!(uploader.calls.len(), 1);
        assert!(Ledger::load(&paths).expect("reload").is_empty());
    }

    #[test]
    fn keep_going_continues_past_failing_entry() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(tmp.path());
        let mut ledger = Ledger::load(&paths).expect("load");
        let mut uploader = FakeUploader {
            fail_on: Some("v1".to_string()),
            ..FakeUploader::default()
        };

        let entries = vec![
            entry("v1", "2024-01-01T10:00:00Z"),
            entry("v2", "2024-01-02T10:00:00Z"),
        ];
        let recordings = vec![
            recording("a.mp4", entries[0].created_at),
            recording("b.mp4", entries[1].created_at),
        ];

        let out = reconcile(
            &paths,
            &entries,
            &recordings,
            &mut ledger,
            &mut uploader,
            RunMode::Apply,
            true,
        )
        .expect("keep going");

        assert_eq!(out.failed, 1);
        assert_eq!(out.uploaded, 1);
        let reloaded = Ledger::load(&paths).expect("reload");
        assert!(!reloaded.contains("v1"));
        assert!(reloaded.contains("v2"));
    }

    #[test]
    fn dry_run_reports_without_uploading_or_ledgering() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(tmp.path());
        let mut ledger = Ledger::load(&paths).expect("load");
        let mut uploader = FakeUploader::default();

        let entries = vec![entry("v1", "2024-01-01T10:00:00Z")];
        let recordings = vec![recording("a.mp4", entries[0].created_at)];

        let out = reconcile(
            &paths,
            &entries,
            &recordings,
            &mut ledger,
            &mut uploader,
            RunMode::DryRun,
            false,
        )
        .expect("dry run");

        assert!(uploader.calls.is_empty());
        assert!(Ledger::load(&paths).expect("reload").is_empty());
        assert_eq!(out.uploaded, 0);
        assert_eq!(out.would_upload, 1);
        assert!(matches!(
            out.reports[0].outcome,
            EntryOutcome::WouldUpload { .. }
        ));
    }

    #[test]
    fn second_lock_acquisition_fails_while_first_is_held() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(tmp.path());

        let held = acquire_run_lock(&paths).expect("first lock");
        assert!(acquire_run_lock(&paths).is_err());
        drop(held);
        acquire_run_lock(&paths).expect("lock after release");
    }
}
