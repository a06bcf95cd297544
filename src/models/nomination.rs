//! Nomination model, including finalist shortlisting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CategoryStatus, StaffSummary};

/// Most finalists a single category may carry into voting.
pub const MAX_FINALISTS: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NominationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Shortlisted,
}

impl NominationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NominationStatus::Pending => "pending",
            NominationStatus::Approved => "approved",
            NominationStatus::Rejected => "rejected",
            NominationStatus::Shortlisted => "shortlisted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(NominationStatus::Pending),
            "approved" => Some(NominationStatus::Approved),
            "rejected" => Some(NominationStatus::Rejected),
            "shortlisted" => Some(NominationStatus::Shortlisted),
            _ => None,
        }
    }

    pub const ALL: [NominationStatus; 4] = [
        NominationStatus::Pending,
        NominationStatus::Approved,
        NominationStatus::Rejected,
        NominationStatus::Shortlisted,
    ];
}

/// A staff member's proposal of a colleague for a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nomination {
    pub id: String,
    pub nominee_id: String,
    /// `None` for anonymous nominations.
    pub nominator_id: Option<String>,
    pub category_id: String,
    pub reason: String,
    pub status: NominationStatus,
    pub is_finalist: bool,
    pub submitted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal category facts embedded in nomination listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub id: String,
    pub title: String,
    pub status: CategoryStatus,
}

/// A nomination joined with the people and category it refers to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NominationDetail {
    #[serde(flatten)]
    pub nomination: Nomination,
    pub nominee: StaffSummary,
    pub nominator: Option<StaffSummary>,
    pub category: CategorySummary,
    /// Whether the caller may still withdraw it.
    pub can_cancel: bool,
}

/// A finalist as listed on the public voting page. Nominators stay hidden.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finalist {
    pub nomination_id: String,
    pub category_id: String,
    pub nominee: StaffSummary,
    pub reason: String,
}

impl From<NominationDetail> for Finalist {
    fn from(detail: NominationDetail) -> Self {
        Finalist {
            nomination_id: detail.nomination.id,
            category_id: detail.nomination.category_id,
            nominee: detail.nominee,
            reason: detail.nomination.reason,
        }
    }
}

/// Details for a nominee who has no staff record yet.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNominee {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub department: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNominationRequest {
    pub category_id: String,
    #[serde(default)]
    pub nominee_id: Option<String>,
    #[serde(default)]
    pub nominee: Option<NewNominee>,
    pub reason: String,
    #[serde(default)]
    pub anonymous: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNominationStatusRequest {
    pub status: NominationStatus,
}

/// Admin listing filter.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NominationFilter {
    #[serde(default)]
    pub status: Option<NominationStatus>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub nominee_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectFinalistsRequest {
    pub nomination_ids: Vec<String>,
}

/// State of a category's shortlist as shown to admins.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shortlist {
    pub category_id: String,
    pub finalists: Vec<NominationDetail>,
    /// Nominations that could still be promoted.
    pub candidates: Vec<NominationDetail>,
    pub remaining_slots: usize,
}

impl Shortlist {
    pub fn build(category_id: String, nominations: Vec<NominationDetail>) -> Self {
        let (finalists, rest): (Vec<_>, Vec<_>) = nominations
            .into_iter()
            .partition(|n| n.nomination.is_finalist);
        let candidates = rest
            .into_iter()
            .filter(|n| n.nomination.status != NominationStatus::Rejected)
            .collect();
        let remaining_slots = MAX_FINALISTS.saturating_sub(finalists.len());
        Self {
            category_id,
            finalists,
            candidates,
            remaining_slots,
        }
    }
}
