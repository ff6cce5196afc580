use crate::error::SyncError;
use crate::sync::paths::SyncPaths;
use anyhow::Result;
use chrono_tz::Tz;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Fully-validated configuration, constructed once at process start and passed
/// by reference into each component. No module reads config state ambiently.
#[derive(Debug, Clone)]
pub struct Config {
    pub twitch: TwitchConfig,
    pub recordings: RecordingsConfig,
    pub youtube: YouTubeConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone)]
pub struct TwitchConfig {
    pub client_id: String,
    pub client_secret: String,
    pub user_login: String,
}

#[derive(Debug, Clone)]
pub struct RecordingsConfig {
    pub dir: PathBuf,
    /// Zone the capture software stamps into filenames. Required with no
    /// default: the automation host and the capture machine may run in
    /// different zones, and a silent fallback to the system zone mismatches
    /// every entry by the offset.
    pub timezone: Tz,
    pub extensions: Vec<String>,
    pub filename_format: String,
}

#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    pub client_secret_path: PathBuf,
    pub channel_id: String,
}

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub enabled: bool,
    pub frequency_minutes: u64,
}

pub fn default_extensions() -> Vec<String> {
    ["mp4", "mkv", "flv", "mov"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

pub const DEFAULT_FILENAME_FORMAT: &str = "%Y-%m-%d %H-%M-%S";

#[derive(Debug, Clone, Default, Deserialize)]
struct RawTwitch {
    client_id: Option<String>,
    client_secret: Option<String>,
    user_login: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawRecordings {
    dir: Option<String>,
    timezone: Option<String>,
    extensions: Option<Vec<String>>,
    filename_format: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawYouTube {
    client_secret_path: Option<String>,
    channel_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawSchedule {
    enabled: Option<bool>,
    frequency_minutes: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    twitch: RawTwitch,
    #[serde(default)]
    recordings: RawRecordings,
    #[serde(default)]
    youtube: RawYouTube,
    #[serde(default)]
    schedule: RawSchedule,
}

fn env_non_empty(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "on" => true,
            "0" | "false" | "FALSE" | "no" | "off" => false,
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn required(value: Option<String>, key: &str, env_var: &str) -> Result<String> {
    value.ok_or_else(|| {
        SyncError::Config(format!("missing required key `{key}` (or set {env_var})")).into()
    })
}

fn read_file_config(paths: &SyncPaths) -> Result<RawConfig> {
    if !paths.config_file.exists() {
        return Ok(RawConfig::default());
    }
    let raw = fs::read_to_string(&paths.config_file).map_err(|err| {
        SyncError::Config(format!(
            "failed to read {}: {err}",
            paths.config_file.display()
        ))
    })?;
    let parsed: RawConfig = toml::from_str(&raw).map_err(|err| {
        SyncError::Config(format!(
            "failed to parse {}: {err}",
            paths.config_file.display()
        ))
    })?;
    Ok(parsed)
}

fn apply_env_overrides(raw: &mut RawConfig) {
    raw.twitch.client_id = env_non_empty("VODSYNC_TWITCH_CLIENT_ID")
        .or_else(|| env_non_empty("TWITCH_CLIENT_ID"))
        .or(raw.twitch.client_id.take());
    raw.twitch.client_secret = env_non_empty("VODSYNC_TWITCH_CLIENT_SECRET")
        .or_else(|| env_non_empty("TWITCH_CLIENT_SECRET"))
        .or(raw.twitch.client_secret.take());
    raw.twitch.user_login =
        env_non_empty("VODSYNC_TWITCH_USER_LOGIN").or(raw.twitch.user_login.take());

    raw.recordings.dir = env_non_empty("VODSYNC_RECORDINGS_DIR").or(raw.recordings.dir.take());
    raw.recordings.timezone =
        env_non_empty("VODSYNC_RECORDINGS_TIMEZONE").or(raw.recordings.timezone.take());
    raw.recordings.filename_format =
        env_non_empty("VODSYNC_FILENAME_FORMAT").or(raw.recordings.filename_format.take());

    raw.youtube.client_secret_path =
        env_non_empty("VODSYNC_YOUTUBE_CLIENT_SECRET_PATH").or(raw.youtube.client_secret_path.take());
    raw.youtube.channel_id =
        env_non_empty("VODSYNC_YOUTUBE_CHANNEL_ID").or(raw.youtube.channel_id.take());

    raw.schedule.enabled = Some(env_or_bool(
        "VODSYNC_SCHEDULE_ENABLED",
        raw.schedule.enabled.unwrap_or(false),
    ));
    raw.schedule.frequency_minutes = Some(env_or_u64(
        "VODSYNC_SCHEDULE_FREQUENCY_MINUTES",
        raw.schedule.frequency_minutes.unwrap_or(1440),
    ));
}

fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>().map_err(|_| {
        SyncError::Config(format!(
            "invalid recordings.timezone `{name}`: expected an IANA zone name like Europe/Berlin"
        ))
        .into()
    })
}

fn validate(raw: RawConfig) -> Result<Config> {
    let twitch = TwitchConfig {
        client_id: required(
            raw.twitch.client_id,
            "twitch.client_id",
            "TWITCH_CLIENT_ID",
        )?,
        client_secret: required(
            raw.twitch.client_secret,
            "twitch.client_secret",
            "TWITCH_CLIENT_SECRET",
        )?,
        user_login: required(
            raw.twitch.user_login,
            "twitch.user_login",
            "VODSYNC_TWITCH_USER_LOGIN",
        )?,
    };

    let dir = required(
        raw.recordings.dir,
        "recordings.dir",
        "VODSYNC_RECORDINGS_DIR",
    )?;
    let timezone = required(
        raw.recordings.timezone,
        "recordings.timezone",
        "VODSYNC_RECORDINGS_TIMEZONE",
    )?;
    let extensions = raw
        .recordings
        .extensions
        .filter(|list| !list.is_empty())
        .unwrap_or_else(default_extensions)
        .into_iter()
        .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
        .collect();
    let recordings = RecordingsConfig {
        dir: PathBuf::from(dir),
        timezone: parse_timezone(&timezone)?,
        extensions,
        filename_format: raw
            .recordings
            .filename_format
            .unwrap_or_else(|| DEFAULT_FILENAME_FORMAT.to_string()),
    };

    let youtube = YouTubeConfig {
        client_secret_path: PathBuf::from(required(
            raw.youtube.client_secret_path,
            "youtube.client_secret_path",
            "VODSYNC_YOUTUBE_CLIENT_SECRET_PATH",
        )?),
        channel_id: required(
            raw.youtube.channel_id,
            "youtube.channel_id",
            "VODSYNC_YOUTUBE_CHANNEL_ID",
        )?,
    };

    let schedule = ScheduleConfig {
        enabled: raw.schedule.enabled.unwrap_or(false),
        frequency_minutes: raw.schedule.frequency_minutes.unwrap_or(1440),
    };
    if schedule.frequency_minutes == 0 {
        return Err(
            SyncError::Config("invalid schedule.frequency_minutes: must be >= 1".to_string())
                .into(),
        );
    }

    Ok(Config {
        twitch,
        recordings,
        youtube,
        schedule,
    })
}

pub fn load_config(paths: &SyncPaths) -> Result<Config> {
    let mut raw = read_file_config(paths)?;
    apply_env_overrides(&mut raw);
    validate(raw)
}
