use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("invalid response from {url}: {status}")]
    Status { url: String, status: StatusCode },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("parse source map url: {0}")]
    LocatorParse(String),

    #[error("read JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid source map: {0}")]
    Validation(String),

    #[error("unsafe source path {0:?}")]
    Sanitization(String),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read response body: {0}")]
    Body(String),

    #[error("{0} queue closed")]
    ChannelClosed(&'static str),

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ScanError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScanError::Io {
            path: path.into(),
            source,
        }
    }

    /// Short, stable name of the error class, used as a statistics key.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::Fetch(_) | ScanError::Status { .. } | ScanError::Body(_) => "fetch",
            ScanError::Parse(_) | ScanError::InvalidUrl(_) => "parse",
            ScanError::LocatorParse(_) => "locator",
            ScanError::Decode(_) => "decode",
            ScanError::Validation(_) => "validation",
            ScanError::Sanitization(_) => "sanitization",
            ScanError::Io { .. } => "io",
            ScanError::ChannelClosed(_) | ScanError::Join(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
