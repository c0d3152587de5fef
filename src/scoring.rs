//! Heuristic quality score for an app's store metrics
//!
//! Three bands add up to at most 100: rating (40), rating volume (30) and
//! install count (30).

use crate::lookup::RatingRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static INSTALLS_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\d,]+").expect("installs pattern is valid"));

/// Score bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreCategory {
    Excellent,
    Good,
    Average,
    Poor,
}

impl ScoreCategory {
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => ScoreCategory::Excellent,
            60..=79 => ScoreCategory::Good,
            40..=59 => ScoreCategory::Average,
            _ => ScoreCategory::Poor,
        }
    }
}

/// Metrics the score is computed from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreInput {
    pub rating: f64,
    pub ratings_count: u64,
    pub reviews: u64,
    pub installs: String,
}

impl From<&RatingRecord> for ScoreInput {
    fn from(record: &RatingRecord) -> Self {
        Self {
            rating: record.rating,
            ratings_count: record.ratings_count,
            reviews: record.reviews,
            installs: record.installs.clone(),
        }
    }
}

/// Per-band points plus the derived total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppScore {
    pub score: u32,
    pub rating_points: u32,
    pub volume_points: u32,
    pub install_points: u32,
    pub category: ScoreCategory,
    pub insights: Vec<String>,
}

/// Compute the score, category and insights for one app
pub fn score_app(input: &ScoreInput) -> AppScore {
    let installs = parse_installs(&input.installs);

    let (rating_points, rating_insight) = match input.rating {
        r if r >= 4.5 => (40, "Excellent user rating"),
        r if r >= 4.0 => (30, "Good user rating"),
        r if r >= 3.5 => (20, "Average user rating"),
        _ => (10, "Below average rating"),
    };

    let (volume_points, volume_insight) = match input.ratings_count {
        100_000.. => (30, "Large user base with extensive feedback"),
        10_000..=99_999 => (20, "Good amount of user feedback"),
        1_000..=9_999 => (10, "Moderate user feedback"),
        _ => (5, "Limited user feedback"),
    };

    let (install_points, install_insight) = match installs {
        10_000_000.. => (30, "Widely installed app"),
        1_000_000..=9_999_999 => (20, "Popular app"),
        100_000..=999_999 => (10, "Growing user base"),
        _ => (5, "Emerging app"),
    };

    let score = rating_points + volume_points + install_points;

    AppScore {
        score,
        rating_points,
        volume_points,
        install_points,
        category: ScoreCategory::from_score(score),
        insights: vec![
            rating_insight.to_string(),
            volume_insight.to_string(),
            install_insight.to_string(),
        ],
    }
}

/// Parse the first run of digits and commas, e.g. "10,000,000+" -> 10000000
pub fn parse_installs(installs: &str) -> u64 {
    INSTALLS_NUMBER
        .find(installs)
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
        .unwrap_or(0)
}
