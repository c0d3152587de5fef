//! HTTP rating lookup against a google-play-scraper compatible REST API
//!
//! Two requests per lookup: a search for the best match, then the detail
//! document for that app id. The detail document is normalized into a
//! [`RatingRecord`] with "Unknown"/zero defaults for missing fields.

use super::{LookupError, RatingLookup, RatingRecord, UNKNOWN};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const PLAY_STORE_DETAILS_URL: &str = "https://play.google.com/store/apps/details?id=";

/// Client configuration
#[derive(Debug, Clone)]
pub struct PlayStoreClientConfig {
    pub base_url: String,
    pub country: String,
    pub language: String,
    pub timeout: Duration,
}

impl Default for PlayStoreClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            country: "us".to_string(),
            language: "en".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&crate::config::LookupSection> for PlayStoreClientConfig {
    fn from(section: &crate::config::LookupSection) -> Self {
        Self {
            base_url: section.base_url.clone(),
            country: section.country.clone(),
            language: section.language.clone(),
            timeout: Duration::from_secs(section.timeout_secs),
        }
    }
}

/// Play Store lookup client
pub struct PlayStoreClient {
    config: PlayStoreClientConfig,
    base_url: Url,
    client: Client,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    Wrapped { results: Vec<SearchHit> },
    Bare(Vec<SearchHit>),
}

impl SearchResponse {
    fn into_hits(self) -> Vec<SearchHit> {
        match self {
            SearchResponse::Wrapped { results } => results,
            SearchResponse::Bare(hits) => hits,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchHit {
    app_id: String,
}

/// Raw detail document; every field except the id is optional upstream
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppDetails {
    app_id: String,
    title: Option<String>,
    score: Option<f64>,
    ratings: Option<u64>,
    reviews: Option<u64>,
    installs: Option<String>,
    free: Option<bool>,
    price: Option<f64>,
    price_text: Option<String>,
    developer: Option<String>,
    /// Milliseconds since the Unix epoch
    updated: Option<i64>,
    version: Option<String>,
    url: Option<String>,
}

impl PlayStoreClient {
    /// Create a new client
    pub fn new(config: PlayStoreClientConfig) -> Result<Self, LookupError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            LookupError::Upstream(format!("Invalid lookup base URL '{}': {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(LookupError::Upstream(format!(
                "Lookup base URL '{}' cannot carry a path",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LookupError::Upstream(e.to_string()))?;

        Ok(Self {
            config,
            base_url,
            client,
        })
    }

    /// Build an endpoint URL below the base path (pure function)
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn search(&self, term: &str) -> Result<String, LookupError> {
        let mut url = self.endpoint(&["api", "apps", ""]);
        url.query_pairs_mut()
            .append_pair("q", term)
            .append_pair("num", "1")
            .append_pair("country", &self.config.country)
            .append_pair("lang", &self.config.language);

        let hits = self.get_json::<SearchResponse>(url).await?.into_hits();

        hits.into_iter()
            .next()
            .map(|hit| hit.app_id)
            .ok_or_else(|| LookupError::NotFound(term.to_string()))
    }

    async fn details(&self, app_id: &str) -> Result<AppDetails, LookupError> {
        let mut url = self.endpoint(&["api", "apps", app_id, ""]);
        url.query_pairs_mut()
            .append_pair("country", &self.config.country)
            .append_pair("lang", &self.config.language);

        self.get_json(url).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, LookupError> {
        debug!(url = %url, "Requesting rating data");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| LookupError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "Rating lookup returned error status");
            return Err(LookupError::Upstream(format!(
                "HTTP {} from {}",
                status.as_u16(),
                url.path()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| LookupError::InvalidResponse(e.to_string()))
    }

    /// Normalize a detail document into a rating record (pure function)
    fn normalize(details: AppDetails) -> RatingRecord {
        let price = if details.free.unwrap_or(false) {
            "Free".to_string()
        } else {
            details
                .price_text
                .filter(|text| !text.trim().is_empty())
                .or_else(|| details.price.map(|p| format!("{p:.2}")))
                .unwrap_or_else(|| UNKNOWN.to_string())
        };

        let last_updated = details
            .updated
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_else(|| UNKNOWN.to_string());

        let url = details
            .url
            .unwrap_or_else(|| format!("{PLAY_STORE_DETAILS_URL}{}", details.app_id));

        RatingRecord {
            title: details.title.unwrap_or_else(|| details.app_id.clone()),
            rating: details.score.unwrap_or(0.0).clamp(0.0, 5.0),
            ratings_count: details.ratings.unwrap_or(0),
            reviews: details.reviews.unwrap_or(0),
            installs: details.installs.unwrap_or_else(|| UNKNOWN.to_string()),
            price,
            developer: details.developer.unwrap_or_else(|| UNKNOWN.to_string()),
            last_updated,
            version: details.version.unwrap_or_else(|| UNKNOWN.to_string()),
            url,
            app_id: details.app_id,
        }
    }
}

#[async_trait]
impl RatingLookup for PlayStoreClient {
    async fn lookup(&self, app_name: &str) -> Result<RatingRecord, LookupError> {
        let result = async {
            let app_id = self.search(app_name).await?;
            let details = self.details(&app_id).await?;
            if details.app_id.is_empty() {
                return Err(LookupError::InvalidResponse(
                    "detail document has an empty appId".to_string(),
                ));
            }
            Ok(Self::normalize(details))
        }
        .await;

        result.map_err(LookupError::into_fetch_failure)
    }
}
