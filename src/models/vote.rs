//! Vote model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A voter's single choice within a category. Unique per (voter, category).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: String,
    pub voter_id: String,
    pub category_id: String,
    pub nominee_id: String,
    pub voted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub category_id: String,
    pub nominee_id: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VoteFilter {
    #[serde(default)]
    pub category_id: Option<String>,
}

/// Number of votes one nominee received in one category.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteCount {
    pub category_id: String,
    pub nominee_id: String,
    pub votes: i64,
}
