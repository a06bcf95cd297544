//! Staff directory API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;

use super::{created, reindex_staff, require, success, ApiResult};
use crate::auth::{AdminStaff, CurrentStaff};
use crate::errors::AppError;
use crate::models::{
    looks_like_email, CreateStaffRequest, Staff, StaffRole, StaffSearchQuery,
    UpdateProfileRequest, UpdateStaffRequest,
};
use crate::search::MAX_SEARCH_OFFSET;
use crate::AppState;

/// Maximum number of search results allowed.
const MAX_SEARCH_LIMIT: usize = 100;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffSearchResponse {
    pub results: Vec<StaffSearchHit>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffSearchHit {
    pub staff: Staff,
    pub score: f32,
}

fn check_email(email: &str) -> Result<(), AppError> {
    if !looks_like_email(email.trim()) {
        return Err(AppError::Validation("A valid email is required".to_string()));
    }
    Ok(())
}

/// GET /api/staff - List all staff.
pub async fn list_staff(
    State(state): State<AppState>,
    _current: CurrentStaff,
) -> ApiResult<Vec<Staff>> {
    success(state.repo.list_staff().await?)
}

/// GET /api/staff/search - Prefix search over the directory.
pub async fn search_staff(
    State(state): State<AppState>,
    _current: CurrentStaff,
    Query(params): Query<StaffSearchQuery>,
) -> ApiResult<StaffSearchResponse> {
    if params.offset > MAX_SEARCH_OFFSET {
        return Err(AppError::Validation(format!(
            "offset must not exceed {}",
            MAX_SEARCH_OFFSET
        )));
    }
    let limit = params.limit.min(MAX_SEARCH_LIMIT);
    let hits = state.search.search(&params.q, limit, params.offset)?;

    let mut results = Vec::with_capacity(hits.len());
    for hit in hits {
        if let Some(staff) = state.repo.get_staff(&hit.staff_id).await? {
            results.push(StaffSearchHit {
                staff,
                score: hit.score,
            });
        }
    }

    success(StaffSearchResponse {
        total: results.len(),
        results,
        limit,
        offset: params.offset,
    })
}

/// GET /api/staff/:id - Get a single staff member.
pub async fn get_staff(
    State(state): State<AppState>,
    _current: CurrentStaff,
    Path(id): Path<String>,
) -> ApiResult<Staff> {
    match state.repo.get_staff(&id).await? {
        Some(staff) => success(staff),
        None => Err(AppError::NotFound(format!("Staff member {} not found", id))),
    }
}

/// PUT /api/me - Edit the caller's own profile.
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentStaff,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<Staff> {
    if let Some(name) = &request.name {
        require(name, "Name")?;
    }

    let staff = state
        .repo
        .update_staff(&current.staff.id, &UpdateStaffRequest::from(request))
        .await?;
    reindex_staff(&state, &staff).await;
    success(staff)
}

/// POST /api/admin/staff - Add a staff member.
pub async fn create_staff(
    State(state): State<AppState>,
    AdminStaff(admin): AdminStaff,
    Json(request): Json<CreateStaffRequest>,
) -> ApiResult<Staff> {
    require(&request.name, "Name")?;
    check_email(&request.email)?;

    let staff = state.repo.create_staff(&request).await?;
    reindex_staff(&state, &staff).await;
    tracing::info!(admin = %admin.id, staff_id = %staff.id, "Staff member created");
    created(staff)
}

/// PUT /api/admin/staff/:id - Edit a staff member, including their role.
pub async fn update_staff(
    State(state): State<AppState>,
    AdminStaff(admin): AdminStaff,
    Path(id): Path<String>,
    Json(request): Json<UpdateStaffRequest>,
) -> ApiResult<Staff> {
    if let Some(name) = &request.name {
        require(name, "Name")?;
    }
    if let Some(email) = &request.email {
        check_email(email)?;
    }
    if id == admin.id && request.role == Some(StaffRole::Staff) {
        return Err(AppError::Validation(
            "Admins cannot remove their own admin role".to_string(),
        ));
    }

    let staff = state.repo.update_staff(&id, &request).await?;
    reindex_staff(&state, &staff).await;
    tracing::info!(admin = %admin.id, staff_id = %id, role = staff.role.as_str(), "Staff member updated");
    success(staff)
}

/// DELETE /api/admin/staff/:id - Remove a staff member with no nominations or votes.
pub async fn delete_staff(
    State(state): State<AppState>,
    AdminStaff(admin): AdminStaff,
    Path(id): Path<String>,
) -> ApiResult<()> {
    if id == admin.id {
        return Err(AppError::Validation(
            "Admins cannot delete their own account".to_string(),
        ));
    }

    state.repo.delete_staff(&id).await?;
    if let Err(e) = state.search.remove_staff(&id).await {
        tracing::warn!("Failed to remove staff member from index: {}", e);
    }
    tracing::info!(admin = %admin.id, staff_id = %id, "Staff member deleted");
    success(())
}
