//! Error types for the ticker engine

use thiserror::Error;

/// Fixture retrieval or parse failure.
///
/// Terminal for the widget instance that hit it: the widget shows the
/// unavailable message and never starts animating.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Fixture request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Fixture endpoint returned HTTP {0}")]
    Status(u16),

    #[error("Fixture could not be read: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed fixture: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid fixture location: {0}")]
    InvalidSource(String),
}

pub type FetchResult<T> = Result<T, FetchError>;
