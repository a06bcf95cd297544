//! Sign-up, sign-in and session endpoints.

use axum::{
    extract::{Query, State},
    response::Redirect,
    Json,
};
use chrono::{Duration, Utc};
use serde::Deserialize;

use super::{created, reindex_staff, require, success, ApiResult};
use crate::auth::{self, password, CurrentStaff};
use crate::errors::AppError;
use crate::models::{
    looks_like_email, normalize_email, AuthMethod, CreateStaffRequest, MagicLinkRequest,
    MagicLinkResponse, SessionInfo, SetPasswordRequest, SignInRequest, SignUpRequest, StaffRole,
    VerifyMagicLinkRequest,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GoogleStartQuery {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GoogleCallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Role for a newly created account.
fn initial_role(state: &AppState, email: &str) -> Option<StaffRole> {
    state
        .config
        .is_admin_email(email)
        .then_some(StaffRole::Admin)
}

/// Display name fallback: the local part of the address.
fn name_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

/// POST /api/auth/sign-up - Create a password account and sign in.
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> ApiResult<SessionInfo> {
    require(&request.name, "Name")?;
    let email = normalize_email(&request.email);
    if !looks_like_email(&email) {
        return Err(AppError::Validation("A valid email is required".to_string()));
    }
    if !state.config.email_domain_allowed(&email) {
        return Err(AppError::Forbidden(
            "Sign-up is restricted to the organisation's email domain".to_string(),
        ));
    }
    password::validate_password(&request.password)?;

    // Existing records, including password-less ones created by an admin or
    // a nomination, are only reachable through a verified sign-in.
    if state.repo.find_staff_by_email(&email).await?.is_some() {
        return Err(AppError::conflict("An account with this email already exists"));
    }

    let password_hash = password::hash_password(request.password).await?;
    let staff = state
        .repo
        .create_staff_with_password(
            &CreateStaffRequest {
                name: request.name,
                email: email.clone(),
                position: request.position,
                department: request.department,
                avatar: None,
                role: initial_role(&state, &email),
            },
            &password_hash,
        )
        .await?;
    reindex_staff(&state, &staff).await;

    tracing::info!(staff_id = %staff.id, "Staff member signed up");
    let session = auth::start_session(&state, staff, AuthMethod::Password).await?;
    created(session)
}

/// POST /api/auth/sign-in - Email and password sign-in.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> ApiResult<SessionInfo> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let (staff, stored_hash) = match state.repo.get_staff_credentials(&request.email).await? {
        Some((staff, Some(hash))) => (staff, hash),
        _ => return Err(invalid()),
    };

    if !password::verify_password(request.password, stored_hash).await? {
        tracing::warn!(staff_id = %staff.id, "Failed password sign-in");
        return Err(invalid());
    }

    success(auth::start_session(&state, staff, AuthMethod::Password).await?)
}

/// POST /api/auth/password - Set or change the caller's password.
///
/// Accounts created without a password (by an admin, a nomination or Google
/// sign-in) get one here after signing in by magic link or Google.
pub async fn set_password(
    State(state): State<AppState>,
    current: CurrentStaff,
    Json(request): Json<SetPasswordRequest>,
) -> ApiResult<()> {
    password::validate_password(&request.password)?;

    let (_, stored_hash) = state
        .repo
        .get_staff_credentials(&current.staff.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Session is no longer valid".to_string()))?;

    if let Some(stored) = &stored_hash {
        let given = request.current_password.unwrap_or_default();
        if !password::verify_password(given, stored.clone()).await? {
            tracing::warn!(staff_id = %current.staff.id, "Password change with wrong current password");
            return Err(AppError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }
    }

    let password_hash = password::hash_password(request.password).await?;
    if !state
        .repo
        .replace_staff_password(&current.staff.id, stored_hash.as_deref(), &password_hash)
        .await?
    {
        return Err(AppError::conflict("Password was changed concurrently"));
    }

    tracing::info!(staff_id = %current.staff.id, "Password set");
    success(())
}

/// POST /api/auth/magic-link - Issue a single-use sign-in link.
///
/// Always answers the same way so the endpoint cannot be used to discover
/// accounts. No mail transport exists; the link is written to the log.
pub async fn request_magic_link(
    State(state): State<AppState>,
    Json(request): Json<MagicLinkRequest>,
) -> ApiResult<MagicLinkResponse> {
    let email = normalize_email(&request.email);
    let mut token = None;

    if looks_like_email(&email) {
        if let Some(staff) = state.repo.find_staff_by_email(&email).await? {
            let issued = auth::issue_token();
            let expires_at = Utc::now() + Duration::minutes(state.config.magic_link_ttl_minutes);
            state
                .repo
                .create_magic_link(&issued.id, &staff.email, &issued.secret_hash, expires_at)
                .await?;

            let link = format!(
                "{}/auth/magic-link?token={}",
                state.config.frontend_url.trim_end_matches('/'),
                issued.token
            );
            tracing::info!(staff_id = %staff.id, %link, "Magic link issued");

            if state.config.expose_magic_links {
                token = Some(issued.token);
            }
        } else {
            tracing::info!("Magic link requested for unknown email");
        }
    }

    success(MagicLinkResponse { sent: true, token })
}

/// POST /api/auth/magic-link/verify - Exchange a magic link token for a session.
pub async fn verify_magic_link(
    State(state): State<AppState>,
    Json(request): Json<VerifyMagicLinkRequest>,
) -> ApiResult<SessionInfo> {
    let invalid = || AppError::Unauthorized("Invalid or expired sign-in link".to_string());

    let (id, secret) = auth::split_token(&request.token).ok_or_else(invalid)?;
    let link = state.repo.get_magic_link(id).await?.ok_or_else(invalid)?;

    if link.consumed_at.is_some()
        || link.expires_at < Utc::now()
        || !auth::secret_matches(secret, &link.secret_hash)
    {
        return Err(invalid());
    }
    if !state.repo.consume_magic_link(&link.id).await? {
        return Err(invalid());
    }

    let staff = state
        .repo
        .find_staff_by_email(&link.email)
        .await?
        .ok_or_else(invalid)?;

    success(auth::start_session(&state, staff, AuthMethod::MagicLink).await?)
}

/// GET /api/auth/google - Start the Google sign-in round trip.
pub async fn google_start(
    State(state): State<AppState>,
    Query(query): Query<GoogleStartQuery>,
) -> Result<Redirect, AppError> {
    let google = state
        .google
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Google sign-in is not configured".to_string()))?;

    let (url, csrf) = google.authorize_url();
    let next = auth::sanitize_next_path(query.next.as_deref());
    state
        .repo
        .create_oauth_state(csrf.secret(), Some(&next))
        .await?;

    Ok(Redirect::to(url.as_str()))
}

/// GET /auth/callback - Finish Google sign-in and hand the token to the frontend.
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<GoogleCallbackQuery>,
) -> Result<Redirect, AppError> {
    let google = state
        .google
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Google sign-in is not configured".to_string()))?;
    let frontend = state.config.frontend_url.trim_end_matches('/');

    if let Some(error) = query.error {
        tracing::warn!(%error, "Google sign-in was not completed");
        let code: String = error
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        return Ok(Redirect::to(&format!("{}/login#error={}", frontend, code)));
    }

    let (Some(code), Some(csrf)) = (query.code, query.state) else {
        return Err(AppError::BadRequest(
            "Missing code or state parameter".to_string(),
        ));
    };

    let next = state
        .repo
        .take_oauth_state(&csrf)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unknown or expired sign-in state".to_string()))?;

    let profile = google.exchange(code).await?;
    let email = normalize_email(&profile.email);
    if !profile.email_verified {
        return Err(AppError::Forbidden("Google email is not verified".to_string()));
    }
    if !state.config.email_domain_allowed(&email) {
        tracing::warn!(%email, "Google sign-in from outside the allowed domain");
        return Err(AppError::Forbidden(
            "This Google account is not part of the organisation".to_string(),
        ));
    }

    let existed = state.repo.find_staff_by_email(&email).await?.is_some();
    let staff = state
        .repo
        .ensure_staff(&CreateStaffRequest {
            name: profile
                .name
                .clone()
                .unwrap_or_else(|| name_from_email(&email)),
            email: email.clone(),
            position: String::new(),
            department: String::new(),
            avatar: Some(profile.picture.clone()),
            role: initial_role(&state, &email),
        })
        .await?;
    if !existed {
        reindex_staff(&state, &staff).await;
    }

    let session = auth::start_session(&state, staff, AuthMethod::Google).await?;
    let token = session.access_token.unwrap_or_default();
    let next = auth::sanitize_next_path(next.as_deref());

    Ok(Redirect::to(&format!(
        "{}{}#access_token={}",
        frontend, next, token
    )))
}

/// GET /api/auth/session - Describe the caller's session.
pub async fn get_session(current: CurrentStaff) -> ApiResult<SessionInfo> {
    success(SessionInfo {
        access_token: None,
        is_admin: current.staff.is_admin(),
        staff: current.staff,
        method: current.method,
        expires_at: current.expires_at,
    })
}

/// POST /api/auth/sign-out - End the caller's session.
pub async fn sign_out(State(state): State<AppState>, current: CurrentStaff) -> ApiResult<()> {
    state.repo.delete_session(&current.session_id).await?;
    tracing::info!(staff_id = %current.staff.id, "Signed out");
    success(())
}
