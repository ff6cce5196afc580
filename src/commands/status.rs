use anyhow::Result;

use crate::commands::CommandReport;
use crate::sync::config::load_config;
use crate::sync::ledger::Ledger;
use crate::sync::paths::resolve_paths;

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("sync_home={}", paths.sync_home.display()));
    report.detail(format!("config_file={}", paths.config_file.display()));
    report.detail(format!("ledger_file={}", paths.ledger_file.display()));
    report.detail(format!("token_file={}", paths.token_file.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));

    match load_config(&paths) {
        Ok(cfg) => {
            report.detail(format!("twitch_user={}", cfg.twitch.user_login));
            report.detail(format!("recordings_dir={}", cfg.recordings.dir.display()));
            report.detail(format!("recordings_timezone={}", cfg.recordings.timezone));
            report.detail(format!("youtube_channel={}", cfg.youtube.channel_id));
            if !cfg.recordings.dir.exists() {
                report.issue("recordings dir does not exist");
            }
            if !cfg.youtube.client_secret_path.exists() {
                report.issue("youtube client secret file does not exist");
            }
        }
        Err(err) => report.issue(format!("config invalid: {err:#}")),
    }

    match Ledger::load(&paths) {
        Ok(ledger) => report.detail(format!("uploaded vods={}", ledger.len())),
        Err(err) => report.issue(format!("ledger unreadable: {err:#}")),
    }

    if paths.token_file.exists() {
        report.detail("youtube credential present");
    } else {
        report.detail("youtube credential missing (run `vodsync auth`)");
    }

    Ok(report)
}
