//! Award category model and its time-derived phase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::nullable;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CategoryType {
    #[default]
    #[serde(rename = "Individual Award")]
    Individual,
    #[serde(rename = "Team Award")]
    Team,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Individual => "Individual Award",
            CategoryType::Team => "Team Award",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Individual Award" => Some(CategoryType::Individual),
            "Team Award" => Some(CategoryType::Team),
            _ => None,
        }
    }
}

/// Admin-controlled lifecycle: draft → published → closed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoryStatus {
    #[default]
    Draft,
    Published,
    Closed,
}

impl CategoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryStatus::Draft => "draft",
            CategoryStatus::Published => "published",
            CategoryStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(CategoryStatus::Draft),
            "published" => Some(CategoryStatus::Published),
            "closed" => Some(CategoryStatus::Closed),
            _ => None,
        }
    }
}

/// What end users can do in a category right now. Never stored.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CategoryPhase {
    Nominations,
    Voting,
    Upcoming,
    Closed,
}

/// An award category with its nomination and voting windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub status: CategoryStatus,
    pub nomination_deadline: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortlisting_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortlisting_end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voting_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voting_end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: i64,
}

impl Category {
    /// Derive the user-facing phase by comparing `now` against the windows.
    pub fn phase_at(&self, now: DateTime<Utc>) -> CategoryPhase {
        if self.status == CategoryStatus::Closed || self.winner_published_at.is_some() {
            return CategoryPhase::Closed;
        }
        if now <= self.nomination_deadline {
            return CategoryPhase::Nominations;
        }

        let has_voting_window = self.voting_start.is_some() || self.voting_end.is_some();
        let started = self.voting_start.map_or(true, |start| start <= now);
        let ended = self.voting_end.is_some_and(|end| end < now);

        if ended {
            CategoryPhase::Closed
        } else if has_voting_window && started {
            CategoryPhase::Voting
        } else {
            CategoryPhase::Upcoming
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == CategoryStatus::Published
    }

    pub fn view_at(self, now: DateTime<Utc>) -> CategoryView {
        CategoryView {
            phase: self.phase_at(now),
            category: self,
        }
    }
}

/// A category as returned by the API, with its phase evaluated at request time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    #[serde(flatten)]
    pub category: Category,
    pub phase: CategoryPhase,
}

/// Which categories a listing may include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryVisibility {
    PublishedOnly,
    All,
    Status(CategoryStatus),
}

/// Admin listing filter.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CategoryQuery {
    #[serde(default)]
    pub status: Option<CategoryStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(rename = "type", default)]
    pub category_type: CategoryType,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub status: Option<CategoryStatus>,
    pub nomination_deadline: DateTime<Utc>,
    #[serde(default)]
    pub shortlisting_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shortlisting_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub voting_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub voting_end: Option<DateTime<Utc>>,
}

/// Partial category update. Nullable fields take `null` to clear them.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub image: Option<Option<String>>,
    #[serde(rename = "type", default)]
    pub category_type: Option<CategoryType>,
    #[serde(default, deserialize_with = "nullable")]
    pub department: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<CategoryStatus>,
    #[serde(default)]
    pub nomination_deadline: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable")]
    pub shortlisting_start: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub shortlisting_end: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub voting_start: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub voting_end: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

impl UpdateCategoryRequest {
    /// Overlay the request onto `existing`. Moving a closed category back to
    /// draft or published withdraws its announced winner.
    pub fn apply_to(&self, existing: Category) -> Category {
        let status = self.status.unwrap_or(existing.status);
        let reopened = existing.status == CategoryStatus::Closed && status != CategoryStatus::Closed;

        Category {
            title: self
                .title
                .as_deref()
                .map(|t| t.trim().to_string())
                .unwrap_or(existing.title),
            description: self.description.clone().unwrap_or(existing.description),
            image: self.image.clone().unwrap_or(existing.image),
            category_type: self.category_type.unwrap_or(existing.category_type),
            department: self.department.clone().unwrap_or(existing.department),
            status,
            nomination_deadline: self
                .nomination_deadline
                .unwrap_or(existing.nomination_deadline),
            shortlisting_start: self.shortlisting_start.unwrap_or(existing.shortlisting_start),
            shortlisting_end: self.shortlisting_end.unwrap_or(existing.shortlisting_end),
            voting_start: self.voting_start.unwrap_or(existing.voting_start),
            voting_end: self.voting_end.unwrap_or(existing.voting_end),
            winner_id: if reopened { None } else { existing.winner_id },
            winner_published_at: if reopened {
                None
            } else {
                existing.winner_published_at
            },
            ..existing
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishWinnerRequest {
    pub winner_id: String,
}

/// Checks shared by create and update: windows must be ordered when present.
pub fn validate_windows(
    nomination_deadline: DateTime<Utc>,
    voting_start: Option<DateTime<Utc>>,
    voting_end: Option<DateTime<Utc>>,
    shortlisting_start: Option<DateTime<Utc>>,
    shortlisting_end: Option<DateTime<Utc>>,
) -> Result<(), String> {
    if let (Some(start), Some(end)) = (voting_start, voting_end) {
        if end < start {
            return Err("Voting end must not be before voting start".to_string());
        }
    }
    if let (Some(start), Some(end)) = (shortlisting_start, shortlisting_end) {
        if end < start {
            return Err("Shortlisting end must not be before shortlisting start".to_string());
        }
    }
    if let Some(start) = voting_start {
        if start < nomination_deadline {
            return Err("Voting cannot start before the nomination deadline".to_string());
        }
    }
    Ok(())
}
