//! Portal feedback model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    Bug,
    Feature,
    Improvement,
    Other,
}

impl FeedbackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackType::Bug => "bug",
            FeedbackType::Feature => "feature",
            FeedbackType::Improvement => "improvement",
            FeedbackType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bug" => Some(FeedbackType::Bug),
            "feature" => Some(FeedbackType::Feature),
            "improvement" => Some(FeedbackType::Improvement),
            "other" => Some(FeedbackType::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    #[default]
    New,
    Reviewed,
    Resolved,
}

impl FeedbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackStatus::New => "new",
            FeedbackStatus::Reviewed => "reviewed",
            FeedbackStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(FeedbackStatus::New),
            "reviewed" => Some(FeedbackStatus::Reviewed),
            "resolved" => Some(FeedbackStatus::Resolved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: String,
    pub user_id: Option<String>,
    pub user_email: String,
    pub user_name: Option<String>,
    #[serde(rename = "type")]
    pub feedback_type: FeedbackType,
    pub message: String,
    pub status: FeedbackStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedbackRequest {
    #[serde(rename = "type")]
    pub feedback_type: FeedbackType,
    pub message: String,
    /// Required when the caller is not signed in.
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
}

/// The submitter as resolved by the handler, from the session or the form.
#[derive(Debug, Clone)]
pub struct FeedbackAuthor {
    pub user_id: Option<String>,
    pub user_email: String,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFeedbackRequest {
    pub status: FeedbackStatus,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FeedbackFilter {
    #[serde(default)]
    pub status: Option<FeedbackStatus>,
    #[serde(default, rename = "type")]
    pub feedback_type: Option<FeedbackType>,
}
