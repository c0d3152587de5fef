//! Fetch, format and store steps of the ratings pipeline

use super::{PipelineState, Step, StepError};
use crate::history::{HistoryEntry, HistoryStore};
use crate::lookup::{RatingLookup, RatingRecord};
use crate::observability::metrics;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of looking up one requested app
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ItemResultRepr", try_from = "ItemResultRepr")]
pub enum ItemResult {
    Success { app_name: String, data: RatingRecord },
    Failure { app_name: String, error: String },
}

impl ItemResult {
    pub fn app_name(&self) -> &str {
        match self {
            ItemResult::Success { app_name, .. } | ItemResult::Failure { app_name, .. } => app_name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ItemResult::Success { .. })
    }
}

/// Wire shape `{success, appName, data?, error?}`
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemResultRepr {
    success: bool,
    app_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<RatingRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<ItemResult> for ItemResultRepr {
    fn from(item: ItemResult) -> Self {
        match item {
            ItemResult::Success { app_name, data } => Self {
                success: true,
                app_name,
                data: Some(data),
                error: None,
            },
            ItemResult::Failure { app_name, error } => Self {
                success: false,
                app_name,
                data: None,
                error: Some(error),
            },
        }
    }
}

impl TryFrom<ItemResultRepr> for ItemResult {
    type Error = String;

    fn try_from(repr: ItemResultRepr) -> Result<Self, Self::Error> {
        match (repr.success, repr.data, repr.error) {
            (true, Some(data), _) => Ok(ItemResult::Success {
                app_name: repr.app_name,
                data,
            }),
            (false, _, Some(error)) => Ok(ItemResult::Failure {
                app_name: repr.app_name,
                error,
            }),
            (true, None, _) => Err("successful item result requires data".to_string()),
            (false, _, None) => Err("failed item result requires error".to_string()),
        }
    }
}

// ---------- fetch-ratings ----------

#[derive(Debug, Clone)]
pub struct FetchContext {
    pub app_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchOutput {
    /// One result per requested app, in request order
    pub ratings: Vec<ItemResult>,
    pub timestamp: DateTime<Utc>,
}

/// Looks up each app in turn, recording failures per item
pub struct FetchStep {
    lookup: Arc<dyn RatingLookup>,
}

impl FetchStep {
    pub fn new(lookup: Arc<dyn RatingLookup>) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl Step for FetchStep {
    const ID: &'static str = "fetch-ratings";
    const STATE: PipelineState = PipelineState::Fetching;

    type Context = FetchContext;
    type Output = FetchOutput;

    async fn execute(&self, context: &FetchContext) -> Result<FetchOutput, StepError> {
        let mut ratings = Vec::with_capacity(context.app_names.len());

        for app_name in &context.app_names {
            let item = match self.lookup.lookup(app_name).await {
                Ok(data) => {
                    debug!(app_name = %app_name, app_id = %data.app_id, "Fetched rating");
                    ItemResult::Success {
                        app_name: app_name.clone(),
                        data,
                    }
                }
                Err(e) => {
                    warn!(app_name = %app_name, error = %e, "Rating fetch failed");
                    ItemResult::Failure {
                        app_name: app_name.clone(),
                        error: e.to_string(),
                    }
                }
            };
            metrics().item_fetched(item.is_success());
            ratings.push(item);
        }

        Ok(FetchOutput {
            ratings,
            timestamp: Utc::now(),
        })
    }
}

// ---------- format-results ----------

/// Trigger input plus fetch output; the step requires one result per requested app
#[derive(Debug, Clone)]
pub struct FormatContext {
    pub app_names: Vec<String>,
    pub fetch: FetchOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatOutput {
    pub report: String,
    /// Successful records only
    pub ratings: Vec<RatingRecord>,
}

/// Renders the human-readable report
pub struct FormatStep;

#[async_trait]
impl Step for FormatStep {
    const ID: &'static str = "format-results";
    const STATE: PipelineState = PipelineState::Formatting;

    type Context = FormatContext;
    type Output = FormatOutput;

    async fn execute(&self, context: &FormatContext) -> Result<FormatOutput, StepError> {
        if context.fetch.ratings.len() != context.app_names.len() {
            return Err(StepError::new(format!(
                "fetch produced {} results for {} requested apps",
                context.fetch.ratings.len(),
                context.app_names.len()
            )));
        }

        let report = format_report(&context.fetch);
        let ratings = context
            .fetch
            .ratings
            .iter()
            .filter_map(|item| match item {
                ItemResult::Success { data, .. } => Some(data.clone()),
                ItemResult::Failure { .. } => None,
            })
            .collect();

        Ok(FormatOutput { report, ratings })
    }
}

/// `1234567` → `"1,234,567"`
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Report text for a fetch result; depends only on its input
pub fn format_report(fetch: &FetchOutput) -> String {
    let mut report = format!(
        "📊 App Ratings Report - {}\n\n",
        fetch.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );

    let (successes, failures): (Vec<_>, Vec<_>) =
        fetch.ratings.iter().partition(|item| item.is_success());

    if !successes.is_empty() {
        report.push_str("✅ Successfully Retrieved:\n\n");
        for item in successes {
            if let ItemResult::Success { data, .. } = item {
                // Writing into a String cannot fail
                let _ = write!(
                    report,
                    "📱 {}\n   ⭐ Rating: {}/5.0 ({} ratings)\n   💬 Reviews: {}\n   📥 Installs: {}\n   👨‍💻 Developer: {}\n   🔗 {}\n\n",
                    data.title,
                    data.rating,
                    group_thousands(data.ratings_count),
                    group_thousands(data.reviews),
                    data.installs,
                    data.developer,
                    data.url,
                );
            }
        }
    }

    if !failures.is_empty() {
        report.push_str("\n❌ Failed to Retrieve:\n\n");
        for item in failures {
            if let ItemResult::Failure { app_name, error } = item {
                let _ = writeln!(report, "   • {app_name}: {error}");
            }
        }
    }

    report
}

// ---------- store-results ----------

/// Formatted output of the run, the only thing the store step reads
#[derive(Debug, Clone)]
pub struct StoreContext {
    pub format: FormatOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreOutput {
    /// Entries actually appended
    pub stored: usize,
    /// Records whose entry was appended, in input order
    pub records: Vec<RatingRecord>,
    pub timestamp: DateTime<Utc>,
}

/// Persists successful records to the history store, best effort
pub struct StoreStep {
    store: Option<Arc<dyn HistoryStore>>,
}

impl StoreStep {
    pub fn new(store: Option<Arc<dyn HistoryStore>>) -> Self {
        Self { store }
    }

    /// `rating_history:{appId}:{timestamp}`
    pub fn history_key(app_id: &str, timestamp: &DateTime<Utc>) -> String {
        format!(
            "rating_history:{app_id}:{}",
            timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

#[async_trait]
impl Step for StoreStep {
    const ID: &'static str = "store-results";
    const STATE: PipelineState = PipelineState::Storing;

    type Context = StoreContext;
    type Output = StoreOutput;

    async fn execute(&self, context: &StoreContext) -> Result<StoreOutput, StepError> {
        let timestamp = Utc::now();

        let Some(store) = &self.store else {
            warn!("History store is not configured; skipping historical rating storage");
            return Ok(StoreOutput {
                stored: 0,
                records: Vec::new(),
                timestamp,
            });
        };

        let mut records = Vec::with_capacity(context.format.ratings.len());
        for record in &context.format.ratings {
            let content = serde_json::to_string(record)
                .map_err(|e| StepError::new(format!("failed to encode {}: {e}", record.app_id)))?;
            let entry = HistoryEntry {
                role: "assistant".to_string(),
                content,
                key: Self::history_key(&record.app_id, &timestamp),
            };

            match store.append(entry).await {
                Ok(()) => records.push(record.clone()),
                Err(e) => warn!(app_id = %record.app_id, error = %e, "Failed to store rating history"),
            }
        }

        let stored = records.len();
        metrics().records_stored(stored);
        info!(stored, attempted = context.format.ratings.len(), "Stored rating history");
        Ok(StoreOutput {
            stored,
            records,
            timestamp,
        })
    }
}
