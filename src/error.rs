//! Failure taxonomy shared by every adapter.
//!
//! Nothing here ever reaches the caller as a raw error: the envelope turns
//! each variant into the adapter's structured failure response.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    /// A required external tool or capability is not available.
    #[error("missing dependency: {0}")]
    MissingDependency(String),

    /// Request JSON was malformed or lacked a required field.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Page bounds outside `[1, page_count]` or inverted.
    #[error("invalid chunk range: {start}-{end} (pages={page_count})")]
    InvalidRange {
        start: i64,
        end: i64,
        page_count: u32,
    },

    /// The source document could not be opened or decoded.
    #[error("failed to read pdf: {detail}")]
    SourceRead { path: PathBuf, detail: String },

    /// The conversion backend raised.
    #[error("conversion failed: {0}")]
    Conversion(String),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AdapterError {
    pub fn source_read(path: impl Into<PathBuf>, detail: impl std::fmt::Display) -> Self {
        Self::SourceRead {
            path: path.into(),
            detail: detail.to_string(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}

pub type AdapterResult<T> = std::result::Result<T, AdapterError>;
