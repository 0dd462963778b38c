//! Error types for each stage of the reply pipeline.

use reqwest::StatusCode;
use thiserror::Error;

/// A single failed media download attempt.
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("tweet has no media")]
    NoMedia,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("media server returned {0}")]
    Status(StatusCode),
}

/// Media retrieval gave up.
#[derive(Error, Debug)]
#[error("media download from {url} failed after {attempts} attempt(s)")]
pub struct DownloadError {
    pub url: String,
    pub attempts: u32,
    #[source]
    pub last: MediaError,
}

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("classifier returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid classifier response")]
    InvalidResponse(#[from] serde_json::Error),
}

#[derive(Error, Debug, PartialEq)]
pub enum ComposeError {
    #[error("confidence {0:?} is not a number between 0 and 1")]
    InvalidConfidence(String),

    #[error("no message template for label {0:?}")]
    UnknownLabel(String),
}

#[derive(Error, Debug)]
pub enum TwitterError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("invalid Twitter API response")]
    Json(#[from] serde_json::Error),

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("Twitter API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("no credentials configured for account {0}")]
    MissingCredentials(u64),
}

pub type TwitterResult<T> = Result<T, TwitterError>;

/// Why a reply could not be produced for an eligible tweet.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("download failed")]
    DownloadFailed(#[from] DownloadError),

    #[error("classification failed")]
    ClassificationFailed(#[from] ClassifierError),

    #[error("failed to compose reply text")]
    ComposeFailed(#[from] ComposeError),

    #[error("failed to post reply")]
    PostFailed(#[source] TwitterError),
}

impl DispatchError {
    /// Short stage name for log fields.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::DownloadFailed(_) => "download",
            Self::ClassificationFailed(_) => "classify",
            Self::ComposeFailed(_) => "compose",
            Self::PostFailed(_) => "post",
        }
    }
}

/// Render `err` and every `source()` below it, joined with `: `.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
