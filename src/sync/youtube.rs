use crate::error::SyncError;
use crate::sync::config::YouTubeConfig;
use crate::sync::token_store::{CredentialStore, StoredToken};
use crate::sync::util::now_epoch_secs;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use std::time::Duration;

const OAUTH_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const OAUTH_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/youtube/v3/videos";
const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";
const TOKEN_TIMEOUT_SECS: u64 = 30;
/// Refresh slightly before expiry so the upload never starts with a token
/// about to lapse.
const EXPIRY_SLACK_SECS: u64 = 60;

pub const UPLOAD_SCOPE: &str = "https://www.googleapis.com/auth/youtube.upload";
const MAX_TITLE_CHARS: usize = 100;

/// OAuth client identity parsed from a Google client-secrets file
/// (either the `installed` or `web` shape).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

pub fn load_client_secret(path: &Path) -> Result<ClientSecret> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read client secret {}", path.display()))?;
    let parsed: ClientSecretFile = serde_json::from_str(&raw).map_err(|err| {
        SyncError::Parse(format!(
            "malformed client secret {}: {err}",
            path.display()
        ))
    })?;
    parsed.installed.or(parsed.web).ok_or_else(|| {
        SyncError::Parse(format!(
            "client secret {} has neither `installed` nor `web` section",
            path.display()
        ))
        .into()
    })
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: u64,
}

fn token_from_response(response: TokenResponse, fallback_refresh: Option<&str>) -> Result<StoredToken> {
    let refresh_token = response
        .refresh_token
        .or_else(|| fallback_refresh.map(ToString::to_string))
        .ok_or_else(|| {
            SyncError::Auth(
                "token response carried no refresh token; re-run consent with prompt=consent"
                    .to_string(),
            )
        })?;
    Ok(StoredToken {
        access_token: response.access_token,
        refresh_token,
        expires_at_epoch_secs: now_epoch_secs()? + response.expires_in,
    })
}

/// Consent URL for the one-time `vodsync auth` bootstrap. `access_type=offline`
/// plus `prompt=consent` forces Google to issue a refresh token.
pub fn consent_url(secret: &ClientSecret) -> String {
    format!(
        "{OAUTH_AUTH_URL}?client_id={}&redirect_uri={OOB_REDIRECT_URI}&response_type=code&scope={UPLOAD_SCOPE}&access_type=offline&prompt=consent",
        secret.client_id
    )
}

pub fn exchange_authorization_code(secret: &ClientSecret, code: &str) -> Result<StoredToken> {
    let http = Client::builder()
        .timeout(Duration::from_secs(TOKEN_TIMEOUT_SECS))
        .build()
        .context("failed to build http client")?;
    let response = http
        .post(OAUTH_TOKEN_URL)
        .form(&[
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
            ("code", code.trim()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", OOB_REDIRECT_URI),
        ])
        .send()
        .context("authorization code exchange failed")?;
    if !response.status().is_success() {
        return Err(SyncError::Auth(format!(
            "authorization code exchange returned {}",
            response.status()
        ))
        .into());
    }
    let parsed: TokenResponse = response
        .json()
        .context("invalid JSON from oauth token endpoint")?;
    token_from_response(parsed, None)
}

/// Seam between the reconciliation driver and the hosting platform; the
/// driver only ever sees this trait.
pub trait Uploader {
    /// Push one local file; returns the remote video id.
    fn upload(&mut self, file: &Path, title: &str, vod_id: &str, category: &str)
    -> Result<String>;
}

pub struct YouTubeUploader {
    http: Client,
    secret: ClientSecret,
    store: Box<dyn CredentialStore>,
    channel_id: String,
}

fn limit_title(title: &str) -> String {
    if title.chars().count() <= MAX_TITLE_CHARS {
        return title.to_string();
    }
    let mut out: String = title.chars().take(MAX_TITLE_CHARS - 1).collect();
    out.push('…');
    out
}

fn video_metadata(title: &str, vod_id: &str, category: &str) -> Value {
    json!({
        "snippet": {
            "title": limit_title(title),
            "description": format!("Archived Twitch broadcast {vod_id}\nCategory: {category}"),
            "tags": ["twitch", "vod", category],
        },
        "status": {
            "privacyStatus": "private",
            "selfDeclaredMadeForKids": false,
        },
    })
}

impl YouTubeUploader {
    pub fn new(cfg: &YouTubeConfig, store: Box<dyn CredentialStore>) -> Result<Self> {
        let secret = load_client_secret(&cfg.client_secret_path)?;
        // Uploads can run for a long time on slow links; no request timeout
        // on this client, token calls bound their own wait via the endpoint.
        let http = Client::builder()
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            secret,
            store,
            channel_id: cfg.channel_id.clone(),
        })
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    fn refresh(&self, stored: &StoredToken) -> Result<StoredToken> {
        let response = self
            .http
            .post(OAUTH_TOKEN_URL)
            .form(&[
                ("client_id", self.secret.client_id.as_str()),
                ("client_secret", self.secret.client_secret.as_str()),
                ("refresh_token", stored.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .timeout(Duration::from_secs(TOKEN_TIMEOUT_SECS))
            .send()
            .context("token refresh request failed")?;
        if !response.status().is_success() {
            return Err(SyncError::Auth(format!(
                "token refresh returned {}",
                response.status()
            ))
            .into());
        }
        let parsed: TokenResponse = response
            .json()
            .context("invalid JSON from oauth token endpoint")?;
        let refreshed = token_from_response(parsed, Some(&stored.refresh_token))?;
        self.store.save(&refreshed)?;
        Ok(refreshed)
    }

    fn access_token(&self) -> Result<String> {
        let Some(stored) = self.store.load()? else {
            return Err(SyncError::Auth(
                "no stored YouTube credential; run `vodsync auth` first".to_string(),
            )
            .into());
        };
        if stored.expires_at_epoch_secs > now_epoch_secs()? + EXPIRY_SLACK_SECS {
            return Ok(stored.access_token);
        }
        Ok(self.refresh(&stored)?.access_token)
    }

    fn open_upload_session(&self, token: &str, metadata: &Value) -> Result<String> {
        let response = self
            .http
            .post(UPLOAD_URL)
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .bearer_auth(token)
            .header("X-Upload-Content-Type", "video/*")
            .json(metadata)
            .timeout(Duration::from_secs(TOKEN_TIMEOUT_SECS))
            .send()
            .context("resumable upload session request failed")?;
        if !response.status().is_success() {
            return Err(SyncError::Upload(format!(
                "upload session returned {}",
                response.status()
            ))
            .into());
        }
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
            .ok_or_else(|| {
                SyncError::Upload("upload session response had no Location header".to_string())
            })?;
        Ok(location)
    }
}

impl Uploader for YouTubeUploader {
    fn upload(
        &mut self,
        file: &Path,
        title: &str,
        vod_id: &str,
        category: &str,
    ) -> Result<String> {
        let token = self.access_token()?;
        let metadata = video_metadata(title, vod_id, category);
        let session_url = self.open_upload_session(&token, &metadata)?;

        let body = fs::File::open(file)
            .with_context(|| format!("failed to open {}", file.display()))?;
        let response = self
            .http
            .put(&session_url)
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, "video/*")
            .body(body)
            .send()
            .with_context(|| format!("upload of {} failed", file.display()))?;
        if !response.status().is_success() {
            return Err(SyncError::Upload(format!(
                "upload of {} returned {}",
                file.display(),
                response.status()
            ))
            .into());
        }

        let parsed: Value = response.json().context("invalid JSON from upload")?;
        let video_id = parsed
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| SyncError::Upload("upload response carried no video id".to_string()))?;
        Ok(video_id.to_string())
    }
}
