//! Error types for the status watcher
//!
//! This module defines the leaf error types used by the fetcher and parser.

use thiserror::Error;

/// Errors that can occur while fetching the status page
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status code returned by the server
    #[error("Server returned status {0}")]
    ServerError(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Content decoding error
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Whether the next scheduled tick may reasonably succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout => true,
            Self::ServerError(code) => matches!(code, 429 | 500 | 502 | 503 | 504),
            Self::Decode(_) | Self::InvalidUrl(_) => false,
        }
    }
}

/// Errors raised while preparing or running the status parser
///
/// Document content never produces one of these; an unreadable page simply
/// yields no verdicts.
#[derive(Error, Debug)]
pub enum ParseError {
    /// A label pattern failed to compile
    #[error("Invalid label pattern for '{label}': {source}")]
    InvalidPattern {
        label: String,
        #[source]
        source: regex::Error,
    },

    /// No server could be resolved from the document
    #[error("No server status found in document")]
    NothingResolved,
}
