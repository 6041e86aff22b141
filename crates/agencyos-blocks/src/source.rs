//! The content source collaborator.
//!
//! A content source returns raw records; turning them into typed blocks is
//! the resolver's job.

use std::path::PathBuf;

use agencyos_core::ItemId;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Content source errors.
///
/// A record that does not exist is not an error: fetches return `Ok(None)`.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The request did not complete.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The content source answered with an unexpected status.
    #[error("content source returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// The configured base URL cannot address items.
    #[error("invalid content source URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// The response body was not the expected JSON.
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A fixture file could not be loaded.
    #[error("fixture error in {path}: {message}")]
    Fixture { path: PathBuf, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for content source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Fetches records from the system of record.
///
/// `depth` is the number of relation levels the source should expand inline;
/// sources are free to expand less, callers must cope with identifiers.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch one record of a collection.
    async fn fetch_item(&self, collection: &str, id: &ItemId, depth: u8) -> Result<Option<Value>>;

    /// Fetch the page published at `permalink`.
    async fn fetch_page(&self, permalink: &str, depth: u8) -> Result<Option<Value>>;
}

/// Field selector expanding `depth` levels of relations: `*`, `*.*`, ...
pub fn wildcard_fields(depth: u8) -> String {
    let depth = usize::from(depth.max(1));
    vec!["*"; depth].join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_fields() {
        assert_eq!(wildcard_fields(0), "*");
        assert_eq!(wildcard_fields(1), "*");
        assert_eq!(wildcard_fields(3), "*.*.*");
    }

    #[test]
    fn test_status_error_message() {
        let err = SourceError::Status {
            status: 500,
            url: "https://cms.example.com/items/pages".to_string(),
        };
        assert!(err.to_string().contains("HTTP 500"));
    }
}
