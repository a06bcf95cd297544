//! Session-based authentication.
//!
//! A session token has the form `{session_id}.{secret}`. Only a SHA-256
//! digest of the secret is stored; lookups go by id and the digest is checked
//! with a constant-time comparison to mitigate timing attacks.

pub mod google;
pub mod password;

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use rand::{distr::Alphanumeric, Rng};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{AuthMethod, SessionInfo, Staff};
use crate::AppState;

/// Alternative header for clients that cannot set `Authorization`.
pub const SESSION_HEADER: &str = "x-session-token";

const SECRET_LEN: usize = 43;

/// A freshly minted token. `token` is handed to the client exactly once.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub id: String,
    pub token: String,
    pub secret_hash: String,
}

/// Mint a new `{id}.{secret}` token.
pub fn issue_token() -> IssuedToken {
    let id = uuid::Uuid::new_v4().to_string();
    let secret: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_LEN)
        .map(char::from)
        .collect();
    IssuedToken {
        token: format!("{}.{}", id, secret),
        secret_hash: hash_secret(&secret),
        id,
    }
}

/// Split a presented token into its id and secret parts.
pub fn split_token(token: &str) -> Option<(&str, &str)> {
    let (id, secret) = token.trim().split_once('.')?;
    if id.is_empty() || secret.is_empty() {
        return None;
    }
    Some((id, secret))
}

pub fn hash_secret(secret: &str) -> String {
    format!("{:x}", Sha256::digest(secret.as_bytes()))
}

/// Check a presented secret against a stored digest.
pub fn secret_matches(secret: &str, stored_hash: &str) -> bool {
    constant_time_compare(&hash_secret(secret), stored_hash)
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Pull the session token out of the request headers.
fn token_from_parts(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string());

    bearer.or_else(|| {
        parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    })
}

/// Resolve a token into the session's id and its staff member.
/// Expired, unknown or tampered tokens all resolve to `None`.
pub async fn resolve_token(
    state: &AppState,
    token: &str,
) -> Result<Option<(String, Staff, AuthMethod, chrono::DateTime<Utc>)>, AppError> {
    let Some((id, secret)) = split_token(token) else {
        return Ok(None);
    };
    let Some(session) = state.repo.get_session(id).await? else {
        return Ok(None);
    };
    if !secret_matches(secret, &session.secret_hash) {
        tracing::warn!(session_id = %session.id, "Session secret mismatch");
        return Ok(None);
    }
    if session.expires_at < Utc::now() {
        state.repo.delete_session(&session.id).await?;
        return Ok(None);
    }
    let staff = state.repo.get_staff(&session.staff_id).await?;
    Ok(staff.map(|staff| (session.id, staff, session.method, session.expires_at)))
}

/// Create a session for a staff member and describe it to the client.
pub async fn start_session(
    state: &AppState,
    staff: Staff,
    method: AuthMethod,
) -> Result<SessionInfo, AppError> {
    let issued = issue_token();
    let expires_at = Utc::now() + Duration::hours(state.config.session_ttl_hours);
    state
        .repo
        .create_session(&issued.id, &staff.id, &issued.secret_hash, method, expires_at)
        .await?;

    tracing::info!(staff_id = %staff.id, method = method.as_str(), "Session started");

    Ok(SessionInfo {
        access_token: Some(issued.token),
        is_admin: staff.is_admin(),
        staff,
        method,
        expires_at,
    })
}

/// The signed-in staff member behind the request.
#[derive(Debug, Clone)]
pub struct CurrentStaff {
    pub session_id: String,
    pub staff: Staff,
    pub method: AuthMethod,
    pub expires_at: chrono::DateTime<Utc>,
}

impl FromRequestParts<AppState> for CurrentStaff {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts)
            .ok_or_else(|| AppError::Unauthorized("Missing session token".to_string()))?;

        match resolve_token(state, &token).await? {
            Some((session_id, staff, method, expires_at)) => Ok(CurrentStaff {
                session_id,
                staff,
                method,
                expires_at,
            }),
            None => Err(AppError::Unauthorized(
                "Invalid or expired session".to_string(),
            )),
        }
    }
}

/// A signed-in admin. Admin rights come from `staff.role`, read fresh on
/// every request.
#[derive(Debug, Clone)]
pub struct AdminStaff(pub Staff);

impl FromRequestParts<AppState> for AdminStaff {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let current = CurrentStaff::from_request_parts(parts, state).await?;
        if !current.staff.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminStaff(current.staff))
    }
}

/// The signed-in staff member if there is one. Bad tokens count as anonymous.
#[derive(Debug, Clone)]
pub struct MaybeStaff(pub Option<Staff>);

impl MaybeStaff {
    pub fn is_admin(&self) -> bool {
        self.0.as_ref().is_some_and(Staff::is_admin)
    }
}

impl FromRequestParts<AppState> for MaybeStaff {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = token_from_parts(parts) else {
            return Ok(MaybeStaff(None));
        };
        let resolved = resolve_token(state, &token).await?;
        Ok(MaybeStaff(resolved.map(|(_, staff, _, _)| staff)))
    }
}

/// How often expired sessions, magic links and OAuth states are swept.
pub const PURGE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(10 * 60);

/// Sweep expired auth records forever. Spawned once at startup.
pub async fn continuously_purge_expired(repo: Arc<Repository>, period: std::time::Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        match repo.purge_expired_sessions().await {
            Ok(0) => {}
            Ok(removed) => tracing::info!("Purged {} expired auth records", removed),
            Err(e) => tracing::warn!("Failed to purge expired sessions: {}", e),
        }
    }
}

/// Only allow same-site relative redirect targets.
pub fn sanitize_next_path(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("test-key-123", "test-key-124"));
    }

    #[test]
    fn test_constant_time_compare_different_lengths() {
        assert!(!constant_time_compare("short", "much-longer-key"));
    }

    #[test]
    fn test_issued_token_verifies_against_its_hash() {
        let issued = issue_token();
        let (id, secret) = split_token(&issued.token).unwrap();
        assert_eq!(id, issued.id);
        assert_eq!(secret.len(), SECRET_LEN);
        assert!(secret_matches(secret, &issued.secret_hash));
        assert!(!secret_matches("guess", &issued.secret_hash));
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = issue_token();
        let b = issue_token();
        assert_ne!(a.token, b.token);
        assert_ne!(a.secret_hash, b.secret_hash);
    }

    #[test]
    fn test_split_token_rejects_malformed() {
        assert!(split_token("no-dot").is_none());
        assert!(split_token(".secret").is_none());
        assert!(split_token("id.").is_none());
    }

    #[test]
    fn test_sanitize_next_path() {
        assert_eq!(sanitize_next_path(Some("/my-nominations")), "/my-nominations");
        assert_eq!(sanitize_next_path(Some("//evil.example")), "/");
        assert_eq!(sanitize_next_path(Some("https://evil.example")), "/");
        assert_eq!(sanitize_next_path(None), "/");
    }
}
