//! Staff member model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::nullable;

/// Authorization role. Admin rights derive from this column alone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    #[default]
    Staff,
    Admin,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Staff => "staff",
            StaffRole::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "staff" => Some(StaffRole::Staff),
            "admin" => Some(StaffRole::Admin),
            _ => None,
        }
    }
}

/// An employee who can nominate, be nominated and vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: String,
    pub name: String,
    pub email: String,
    pub position: String,
    /// Department name, stored as free text.
    pub department: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub role: StaffRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

impl Staff {
    pub fn is_admin(&self) -> bool {
        self.role == StaffRole::Admin
    }

    pub fn summary(&self) -> StaffSummary {
        StaffSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            position: self.position.clone(),
            department: self.department.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// The public face of a staff member, embedded in nominations and results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StaffSummary {
    pub id: String,
    pub name: String,
    pub position: String,
    pub department: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Request body for creating a staff record (admin form).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStaffRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub department: String,
    /// `null` removes the avatar.
    #[serde(default, deserialize_with = "nullable")]
    pub avatar: Option<Option<String>>,
    #[serde(default)]
    pub role: Option<StaffRole>,
}

/// Request body for updating a staff record (admin form).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStaffRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    /// `null` removes the avatar.
    #[serde(default, deserialize_with = "nullable")]
    pub avatar: Option<Option<String>>,
    #[serde(default)]
    pub role: Option<StaffRole>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Self-service profile edit. Email and role are not editable here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub avatar: Option<Option<String>>,
}

impl From<UpdateProfileRequest> for UpdateStaffRequest {
    fn from(profile: UpdateProfileRequest) -> Self {
        Self {
            name: profile.name,
            position: profile.position,
            department: profile.department,
            avatar: profile.avatar,
            ..Default::default()
        }
    }
}

/// Directory search parameters.
#[derive(Debug, Deserialize)]
pub struct StaffSearchQuery {
    pub q: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_search_limit() -> usize {
    20
}

/// Normalize an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Loose shape check; the only real verification is the sign-in flow itself.
pub fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_through_text_column() {
        assert_eq!(StaffRole::parse(StaffRole::Admin.as_str()), Some(StaffRole::Admin));
        assert_eq!(StaffRole::parse("superuser"), None);
    }

    #[test]
    fn test_email_shape() {
        assert!(looks_like_email("ada@example.com"));
        assert!(!looks_like_email("ada@example"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("ada lovelace@example.com"));
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
