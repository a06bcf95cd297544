//! Session and sign-in request models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Staff;

/// How a session was established.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    Password,
    MagicLink,
    Google,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Password => "password",
            AuthMethod::MagicLink => "magic_link",
            AuthMethod::Google => "google",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "password" => Some(AuthMethod::Password),
            "magic_link" => Some(AuthMethod::MagicLink),
            "google" => Some(AuthMethod::Google),
            _ => None,
        }
    }
}

/// A stored session row. The secret itself is never stored, only its digest.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: String,
    pub staff_id: String,
    pub secret_hash: String,
    pub method: AuthMethod,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// What the client learns about its session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Only present in the response that creates the session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub staff: Staff,
    pub is_admin: bool,
    pub method: AuthMethod,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub department: String,
}

/// Set or change the caller's password. `currentPassword` is required once
/// the account has one.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPasswordRequest {
    pub password: String,
    #[serde(default)]
    pub current_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MagicLinkRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MagicLinkResponse {
    /// Always true; whether an account exists is not disclosed.
    pub sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyMagicLinkRequest {
    pub token: String,
}

/// Outstanding single-use magic link.
#[derive(Debug, Clone)]
pub struct MagicLinkRecord {
    pub id: String,
    pub email: String,
    pub secret_hash: String,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}
