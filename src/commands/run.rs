use anyhow::Result;
use std::path::Path;

use crate::commands::CommandReport;
use crate::sync::config::load_config;
use crate::sync::driver::{EntryOutcome, RunMode, acquire_run_lock, reconcile};
use crate::sync::ledger::Ledger;
use crate::sync::recordings;
use crate::sync::token_store::FileCredentialStore;
use crate::sync::twitch::TwitchClient;
use crate::sync::youtube::{Uploader, YouTubeUploader};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub keep_going: bool,
    pub dry_run: bool,
}

/// Stand-in for dry runs: reconcile never invokes the uploader in
/// `RunMode::DryRun`, so a real credential is not required.
struct DryRunUploader;

impl Uploader for DryRunUploader {
    fn upload(&mut self, _: &Path, _: &str, _: &str, _: &str) -> Result<String> {
        anyhow::bail!("uploader must not be invoked in dry-run mode")
    }
}

pub fn run(opts: &RunOptions) -> Result<CommandReport> {
    let paths = crate::sync::paths::resolve_paths()?;
    let cfg = load_config(&paths)?;
    let mut report = CommandReport::new("run");

    let _lock = acquire_run_lock(&paths)?;

    let mut ledger = Ledger::load(&paths)?;
    report.detail(format!("ledger entries={}", ledger.len()));

    let twitch = TwitchClient::connect(&cfg.twitch)?;
    let user_id = twitch.resolve_user_id(&cfg.twitch.user_login)?;
    let entries = twitch.list_archive_entries(&user_id)?;
    report.detail(format!(
        "fetched archive entries={} user={} ({})",
        entries.len(),
        cfg.twitch.user_login,
        user_id
    ));

    let scan = recordings::list_candidates(&cfg.recordings)?;
    report.detail(format!(
        "local candidates={} unparsable={}",
        scan.recordings.len(),
        scan.skipped.len()
    ));

    let mode = if opts.dry_run {
        RunMode::DryRun
    } else {
        RunMode::Apply
    };
    let mut dry_run_uploader = DryRunUploader;
    let mut youtube_uploader;
    let uploader: &mut dyn Uploader = if opts.dry_run {
        &mut dry_run_uploader
    } else {
        let store = Box::new(FileCredentialStore::new(paths.token_file.clone()));
        youtube_uploader = YouTubeUploader::new(&cfg.youtube, store)?;
        report.detail(format!("youtube channel={}", youtube_uploader.channel_id()));
        &mut youtube_uploader
    };

    let out = reconcile(
        &paths,
        &entries,
        &scan.recordings,
        &mut ledger,
        uploader,
        mode,
        opts.keep_going,
    )?;

    for entry in &out.reports {
        match &entry.outcome {
            EntryOutcome::SkippedAlreadyUploaded => {
                report.detail(format!("skip vod={} reason=already-uploaded", entry.vod_id));
            }
            EntryOutcome::NoLocalMatch => {
                report.detail(format!(
                    "no-match vod={} title={} (retried next run)",
                    entry.vod_id, entry.title
                ));
            }
            EntryOutcome::Uploaded { video_id, source } => {
                report.detail(format!(
                    "uploaded vod={} video={} source={}",
                    entry.vod_id,
                    video_id,
                    source.display()
                ));
            }
            EntryOutcome::WouldUpload { source } => {
                report.detail(format!(
                    "would-upload vod={} source={}",
                    entry.vod_id,
                    source.display()
                ));
            }
            EntryOutcome::UploadFailed { error } => {
                report.issue(format!("upload failed vod={}: {error}", entry.vod_id));
            }
        }
    }

    if opts.dry_run {
        report.detail(format!(
            "would-upload={} skipped={} unmatched={}",
            out.would_upload, out.skipped, out.unmatched
        ));
    } else {
        report.detail(format!(
            "uploaded={} skipped={} unmatched={} failed={}",
            out.uploaded, out.skipped, out.unmatched, out.failed
        ));
    }

    Ok(report)
}
