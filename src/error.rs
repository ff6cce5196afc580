use thiserror::Error;

/// Failure taxonomy for a reconciliation run. Config and Auth errors abort
/// before any entry is processed. A malformed ledger is a Parse error and is
/// fatal on purpose: treating a corrupt ledger as empty would re-upload the
/// entire archive.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("twitch api error: {0}")]
    RemoteApi(String),
    #[error("authentication error: {0}")]
    Auth(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("upload error: {0}")]
    Upload(String),
}
