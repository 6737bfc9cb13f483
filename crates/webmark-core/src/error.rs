use std::path::PathBuf;

use thiserror::Error;

/// Pipeline error taxonomy. Each stage fails with its own variant so the
/// CLI can surface a precise message; nothing is retried or swallowed.
#[derive(Debug, Error)]
pub enum WebmarkError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("Navigation failed for {url}: {reason}")]
    Navigation { url: String, reason: String },

    /// Known limitation: client-rendered or login-gated pages can yield an
    /// empty body even though the navigation succeeded. Not auto-retried.
    #[error("No visible text extracted from {0}")]
    EmptyContent(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit or quota exceeded: {0}")]
    RateLimitOrQuota(String),

    #[error("Conversion service error {status}: {body}")]
    RemoteService { status: u16, body: String },

    #[error("Failed to write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WebmarkError>;
