//! Rating lookup: the normalized app record and the seam used to fetch it
//!
//! Both the LLM tool and the ratings pipeline consume [`RatingLookup`]; the
//! production implementation is [`PlayStoreClient`].

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::{PlayStoreClient, PlayStoreClientConfig};

/// Placeholder used when the upstream source omits a display field
pub const UNKNOWN: &str = "Unknown";

/// Normalized snapshot of an app's store metrics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RatingRecord {
    pub app_id: String,
    pub title: String,
    /// Average star rating, 0.0 to 5.0
    pub rating: f64,
    pub ratings_count: u64,
    pub reviews: u64,
    /// Display string such as "10,000,000+"
    pub installs: String,
    /// "Free" or a currency-formatted price
    pub price: String,
    pub developer: String,
    /// RFC 3339 timestamp or "Unknown"
    pub last_updated: String,
    pub version: String,
    pub url: String,
}

/// Fetches one rating record for a free-text app name
#[async_trait]
pub trait RatingLookup: Send + Sync {
    async fn lookup(&self, app_name: &str) -> Result<RatingRecord, LookupError>;
}

/// Rating lookup failures
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    #[error("No app found with name: {0}")]
    NotFound(String),
    #[error("Upstream request failed: {0}")]
    Upstream(String),
    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),
    #[error("Failed to fetch app details: {0}")]
    Failed(Box<LookupError>),
}

impl LookupError {
    /// Wrap an error in the user-facing "Failed to fetch app details" context
    pub fn into_fetch_failure(self) -> Self {
        match self {
            already @ LookupError::Failed(_) => already,
            other => LookupError::Failed(Box::new(other)),
        }
    }
}
