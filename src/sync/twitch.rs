use crate::error::SyncError;
use crate::sync::config::TwitchConfig;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;

const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
const HELIX_BASE: &str = "https://api.twitch.tv/helix";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Sentinel category when a VOD carries no game id or the id resolves to
/// nothing.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// One recorded past broadcast as exposed by the Helix archive listing.
/// Immutable for the duration of a run; only the id is ever persisted.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub category: String,
}

#[derive(Debug, Deserialize)]
struct AppTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    data: Vec<UserItem>,
}

#[derive(Debug, Deserialize)]
struct UserItem {
    id: String,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    data: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    title: String,
    created_at: String,
    #[serde(default)]
    game_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GamesResponse {
    data: Vec<GameItem>,
}

#[derive(Debug, Deserialize)]
struct GameItem {
    name: String,
}

fn parse_created_at(vod_id: &str, raw: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw).map_err(|err| {
        SyncError::Parse(format!("vod {vod_id} has malformed created_at `{raw}`: {err}"))
    })?;
    Ok(parsed.with_timezone(&Utc))
}

fn build_entries(
    items: Vec<VideoItem>,
    mut resolve_label: impl FnMut(&str) -> Result<String>,
) -> Result<Vec<ArchiveEntry>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let created_at = parse_created_at(&item.id, &item.created_at)?;
        let category = match item.game_id.as_deref().filter(|id| !id.is_empty()) {
            Some(game_id) => resolve_label(game_id)?,
            None => UNKNOWN_CATEGORY.to_string(),
        };
        out.push(ArchiveEntry {
            id: item.id,
            title: item.title,
            created_at,
            category,
        });
    }
    Ok(out)
}

/// Thin Helix client holding the short-lived app token for one run. The
/// client-credentials token is not refreshed; a reconciliation pass finishes
/// well inside its lifetime.
pub struct TwitchClient {
    http: Client,
    client_id: String,
    bearer: String,
}

impl TwitchClient {
    /// Exchange client credentials for an app access token.
    pub fn connect(cfg: &TwitchConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")?;

        let response = http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", cfg.client_id.as_str()),
                ("client_secret", cfg.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .context("twitch token request failed")?;
        if !response.status().is_success() {
            return Err(SyncError::Auth(format!(
                "twitch credential exchange returned {}",
                response.status()
            ))
            .into());
        }
        let token: AppTokenResponse = response
            .json()
            .context("invalid JSON from twitch token endpoint")?;

        Ok(Self {
            http,
            client_id: cfg.client_id.clone(),
            bearer: token.access_token,
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{HELIX_BASE}/{path}");
        let response = self
            .http
            .get(&url)
            .query(query)
            .header("Client-Id", &self.client_id)
            .bearer_auth(&self.bearer)
            .send()
            .with_context(|| format!("helix request to /{path} failed"))?;
        if !response.status().is_success() {
            return Err(SyncError::RemoteApi(format!(
                "helix /{path} returned {}",
                response.status()
            ))
            .into());
        }
        response
            .json()
            .with_context(|| format!("invalid JSON from helix /{path}"))
    }

    pub fn resolve_user_id(&self, login: &str) -> Result<String> {
        let users: UsersResponse = self.get("users", &[("login", login)])?;
        let user = users.data.into_iter().next().ok_or_else(|| {
            SyncError::RemoteApi(format!("twitch user `{login}` not found"))
        })?;
        Ok(user.id)
    }

    fn resolve_category_label(&self, game_id: &str) -> Result<String> {
        let games: GamesResponse = self.get("games", &[("id", game_id)])?;
        Ok(games
            .data
            .into_iter()
            .next()
            .map(|game| game.name)
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()))
    }

    /// List archive VODs for a user, newest first as Helix returns them, each
    /// enriched with its category label. Labels are cached per run since most
    /// broadcasts share a handful of games.
    pub fn list_archive_entries(&self, user_id: &str) -> Result<Vec<ArchiveEntry>> {
        let videos: VideosResponse = self.get(
            "videos",
            &[("user_id", user_id), ("type", "archive"), ("first", "100")],
        )?;

        let mut label_cache: BTreeMap<String, String> = BTreeMap::new();
        build_entries(videos.data, |game_id| {
            if let Some(label) = label_cache.get(game_id) {
                return Ok(label.clone());
            }
            let label = self.resolve_category_label(game_id)?;
            label_cache.insert(game_id.to_string(), label.clone());
            Ok(label)
        })
    }
}
