// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for paper-renamer

use thiserror::Error;

/// Result type alias for paper-renamer operations
pub type Result<T> = std::result::Result<T, RenamerError>;

/// paper-renamer error types
#[derive(Error, Debug)]
pub enum RenamerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Metadata API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Metadata API rate limit reached")]
    RateLimited,

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Pattern error: {0}")]
    Pattern(String),

    #[error("Journal table error: {0}")]
    JournalTable(String),

    #[error("History error: {0}")]
    History(String),

    #[error("Lookup worker error: {0}")]
    Worker(String),

    #[error("No file at position {position} (batch has {len})")]
    NoSuchEntry { position: usize, len: usize },
}

impl RenamerError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            RenamerError::RateLimited => true,
            RenamerError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            RenamerError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
