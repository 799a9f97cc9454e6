//! Feed Client contract and implementations.
//!
//! The archive engine treats the feed as a black box: one argument-less async
//! call that yields a [`ContentBatch`] or fails with a message-only
//! [`FeedError`]. Rate-limit detection happens downstream on that message
//! (see [`crate::sync::classify_failure`]).
//!
//! - [`FeedClient`] - The async trait the session depends on
//! - [`HttpFeedClient`] - reqwest implementation reading a JSON endpoint

mod http;

pub use http::{HttpFeedClient, HttpFeedConfig};

use async_trait::async_trait;
use std::fmt;

use crate::archive::ContentBatch;

/// Failure reported by a Feed Client. Carries only a message string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedError {
    message: String,
}

impl FeedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FeedError {}

/// Source of fresh content for the archive.
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Fetch the latest batch of articles and citation sources.
    async fn fetch_batch(&self) -> Result<ContentBatch, FeedError>;
}
