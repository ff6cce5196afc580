use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn vodsync(root: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("vodsync");
    cmd.current_dir(root)
        .env("VODSYNC_HOME", root.join("home"))
        .env("VODSYNC_TWITCH_CLIENT_ID", "cid")
        .env("VODSYNC_TWITCH_CLIENT_SECRET", "shh")
        .env("VODSYNC_TWITCH_USER_LOGIN", "streamer")
        .env("VODSYNC_RECORDINGS_DIR", root.join("recordings"))
        .env("VODSYNC_RECORDINGS_TIMEZONE", "UTC")
        .env(
            "VODSYNC_YOUTUBE_CLIENT_SECRET_PATH",
            root.join("client.json"),
        )
        .env("VODSYNC_YOUTUBE_CHANNEL_ID", "UC123");
    cmd
}

#[test]
fn schedule_renders_cron_line_when_enabled() {
    let tmp = tempdir().expect("tempdir");
    fs::create_dir_all(tmp.path().join("home")).expect("mkdir home");

    vodsync(tmp.path())
        .env("VODSYNC_SCHEDULE_ENABLED", "1")
        .env("VODSYNC_SCHEDULE_FREQUENCY_MINUTES", "30")
        .arg("schedule")
        .assert()
        .success()
        .stdout(predicate::str::contains("*/30 * * * *"));
}

#[test]
fn schedule_reports_disabled_by_default() {
    let tmp = tempdir().expect("tempdir");
    fs::create_dir_all(tmp.path().join("home")).expect("mkdir home");

    vodsync(tmp.path())
        .arg("schedule")
        .assert()
        .success()
        .stdout(predicate::str::contains("schedule disabled"));
}
