use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn one feed URL into a list of links.
///
/// Retrieval and parse failures both end up here so the loop only has one
/// thing to skip past.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported feed URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Feed parsing failed: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Seen-links file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Could not start notify command: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Notify command exited with {0}")]
    Failed(std::process::ExitStatus),

    #[error("Notification failed: {0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum FeederError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid feed URL: {0}")]
    InvalidUrl(String),

    // Seen store errors
    #[error(transparent)]
    Store(#[from] StoreError),

    // Feed errors
    #[error(transparent)]
    Fetch(#[from] FetchError),

    // Notification errors
    #[error(transparent)]
    Notify(#[from] NotifyError),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Output errors
    #[error("Serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FeederResult<T> = Result<T, FeederError>;
pub type FetchResult<T> = Result<T, FetchError>;
pub type StoreResult<T> = Result<T, StoreError>;
pub type NotifyResult<T> = Result<T, NotifyError>;
