//! Nomination and shortlist API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;

use super::{created, reindex_staff, require, success, ApiResult};
use crate::auth::{AdminStaff, CurrentStaff};
use crate::errors::AppError;
use crate::models::{
    looks_like_email, Category, CategoryPhase, CategoryStatus, CreateNominationRequest,
    CreateStaffRequest, Nomination, NominationDetail, NominationFilter, NominationStatus,
    SelectFinalistsRequest, Shortlist, Staff, UpdateNominationStatusRequest,
};
use crate::AppState;

async fn existing_category(state: &AppState, id: &str) -> Result<Category, AppError> {
    state
        .repo
        .get_category(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))
}

/// Resolve the nominee: an existing record, or one created from the form.
async fn resolve_nominee(
    state: &AppState,
    request: &CreateNominationRequest,
) -> Result<Staff, AppError> {
    if let Some(nominee_id) = &request.nominee_id {
        return state
            .repo
            .get_staff(nominee_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Staff member {} not found", nominee_id)));
    }

    let Some(nominee) = &request.nominee else {
        return Err(AppError::Validation(
            "Either nomineeId or nominee details are required".to_string(),
        ));
    };
    require(&nominee.name, "Nominee name")?;
    if !looks_like_email(nominee.email.trim()) {
        return Err(AppError::Validation(
            "A valid nominee email is required".to_string(),
        ));
    }

    let existed = state.repo.find_staff_by_email(&nominee.email).await?.is_some();
    let staff = state
        .repo
        .ensure_staff(&CreateStaffRequest {
            name: nominee.name.clone(),
            email: nominee.email.clone(),
            position: nominee.position.clone(),
            department: nominee.department.clone(),
            avatar: None,
            role: None,
        })
        .await?;
    if !existed {
        reindex_staff(state, &staff).await;
    }
    Ok(staff)
}

/// POST /api/nominations - Nominate a colleague.
pub async fn create_nomination(
    State(state): State<AppState>,
    current: CurrentStaff,
    Json(request): Json<CreateNominationRequest>,
) -> ApiResult<NominationDetail> {
    require(&request.reason, "Reason")?;

    let category = existing_category(&state, &request.category_id).await?;
    match category.status {
        CategoryStatus::Draft => {
            return Err(AppError::NotFound(format!(
                "Category {} not found",
                category.id
            )));
        }
        CategoryStatus::Closed => {
            return Err(AppError::Validation(
                "This category is closed".to_string(),
            ));
        }
        CategoryStatus::Published => {}
    }
    if category.phase_at(Utc::now()) != CategoryPhase::Nominations {
        return Err(AppError::Validation(
            "Nominations for this category are closed".to_string(),
        ));
    }

    let nominee = resolve_nominee(&state, &request).await?;
    let nominator_id = (!request.anonymous).then_some(current.staff.id.as_str());

    let nomination = state
        .repo
        .create_nomination(&category.id, &nominee.id, nominator_id, &request.reason)
        .await?;

    tracing::info!(
        nomination_id = %nomination.id,
        category_id = %category.id,
        anonymous = request.anonymous,
        "Nomination submitted"
    );

    let detail = state
        .repo
        .get_nomination_detail(&nomination.id, Some(&current.staff.id))
        .await?
        .ok_or_else(|| AppError::Internal("Nomination vanished after insert".to_string()))?;
    created(detail)
}

/// GET /api/nominations/:id - A nomination the caller submitted (admins see all).
pub async fn get_nomination(
    State(state): State<AppState>,
    current: CurrentStaff,
    Path(id): Path<String>,
) -> ApiResult<NominationDetail> {
    let detail = state
        .repo
        .get_nomination_detail(&id, Some(&current.staff.id))
        .await?
        .filter(|d| {
            current.staff.is_admin()
                || d.nomination.nominator_id.as_deref() == Some(current.staff.id.as_str())
        })
        .ok_or_else(|| AppError::NotFound(format!("Nomination {} not found", id)))?;
    success(detail)
}

/// DELETE /api/nominations/:id - Withdraw one's own pending nomination.
pub async fn cancel_nomination(
    State(state): State<AppState>,
    current: CurrentStaff,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.cancel_nomination(&id, &current.staff.id).await?;
    tracing::info!(nomination_id = %id, staff_id = %current.staff.id, "Nomination cancelled");
    success(())
}

/// GET /api/my-nominations - Nominations the caller submitted.
pub async fn my_nominations(
    State(state): State<AppState>,
    current: CurrentStaff,
) -> ApiResult<Vec<NominationDetail>> {
    success(
        state
            .repo
            .list_nominations_by_nominator(&current.staff.id)
            .await?,
    )
}

/// GET /api/admin/nominations - Filtered listing.
pub async fn list_nominations(
    State(state): State<AppState>,
    _admin: AdminStaff,
    Query(filter): Query<NominationFilter>,
) -> ApiResult<Vec<NominationDetail>> {
    success(state.repo.list_nominations(&filter).await?)
}

/// PUT /api/admin/nominations/:id/status - Review a nomination.
///
/// Moving a nomination to `shortlisted` goes through finalist selection so
/// the finalist cap still applies.
pub async fn update_nomination_status(
    State(state): State<AppState>,
    AdminStaff(admin): AdminStaff,
    Path(id): Path<String>,
    Json(request): Json<UpdateNominationStatusRequest>,
) -> ApiResult<Nomination> {
    let nomination = if request.status == NominationStatus::Shortlisted {
        let current = state
            .repo
            .get_nomination(&id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Nomination {} not found", id)))?;
        if !current.is_finalist {
            state
                .repo
                .select_finalists(&current.category_id, std::slice::from_ref(&id))
                .await?;
        }
        state
            .repo
            .get_nomination(&id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Nomination {} not found", id)))?
    } else {
        state
            .repo
            .update_nomination_status(&id, request.status)
            .await?
    };

    tracing::info!(
        admin = %admin.id,
        nomination_id = %id,
        status = nomination.status.as_str(),
        "Nomination status changed"
    );
    success(nomination)
}

/// DELETE /api/admin/nominations/:id - Delete any nomination.
pub async fn delete_nomination(
    State(state): State<AppState>,
    AdminStaff(admin): AdminStaff,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_nomination(&id).await?;
    tracing::info!(admin = %admin.id, nomination_id = %id, "Nomination deleted");
    success(())
}

/// GET /api/admin/categories/:id/shortlist - Finalists and remaining candidates.
pub async fn get_shortlist(
    State(state): State<AppState>,
    _admin: AdminStaff,
    Path(category_id): Path<String>,
) -> ApiResult<Shortlist> {
    let category = existing_category(&state, &category_id).await?;
    let nominations = state.repo.list_category_nominations(&category.id).await?;
    success(Shortlist::build(category.id, nominations))
}

/// POST /api/admin/categories/:id/finalists - Promote nominations to finalists.
pub async fn select_finalists(
    State(state): State<AppState>,
    AdminStaff(admin): AdminStaff,
    Path(category_id): Path<String>,
    Json(request): Json<SelectFinalistsRequest>,
) -> ApiResult<Shortlist> {
    if request.nomination_ids.is_empty() {
        return Err(AppError::Validation(
            "Select at least one nomination".to_string(),
        ));
    }

    let category = existing_category(&state, &category_id).await?;
    let selection = state
        .repo
        .select_finalists(&category.id, &request.nomination_ids)
        .await?;
    tracing::info!(
        admin = %admin.id,
        category_id = %category.id,
        promoted = selection.promoted,
        "Shortlist updated"
    );

    let nominations = state.repo.list_category_nominations(&category.id).await?;
    success(Shortlist::build(category.id, nominations))
}

/// DELETE /api/admin/nominations/:id/finalist - Remove a finalist.
pub async fn remove_finalist(
    State(state): State<AppState>,
    AdminStaff(admin): AdminStaff,
    Path(id): Path<String>,
) -> ApiResult<Nomination> {
    let nomination = state.repo.remove_finalist(&id).await?;
    tracing::info!(admin = %admin.id, nomination_id = %id, "Finalist removed");
    success(nomination)
}
