//! Voting API endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;

use super::{require, success, ApiResult};
use crate::auth::{AdminStaff, CurrentStaff};
use crate::errors::AppError;
use crate::models::{CastVoteRequest, CategoryPhase, CategoryStatus, Vote, VoteFilter};
use crate::AppState;

/// POST /api/votes - Vote for a finalist. Voting again in the same category
/// replaces the earlier choice.
pub async fn cast_vote(
    State(state): State<AppState>,
    current: CurrentStaff,
    Json(request): Json<CastVoteRequest>,
) -> ApiResult<Vote> {
    require(&request.category_id, "categoryId")?;
    require(&request.nominee_id, "nomineeId")?;

    let category = match state.repo.get_category(&request.category_id).await? {
        Some(category) if category.status != CategoryStatus::Draft => category,
        _ => {
            return Err(AppError::NotFound(format!(
                "Category {} not found",
                request.category_id
            )))
        }
    };
    if !category.is_published() || category.phase_at(Utc::now()) != CategoryPhase::Voting {
        return Err(AppError::Validation(
            "Voting is not open for this category".to_string(),
        ));
    }
    if !state
        .repo
        .is_finalist(&category.id, &request.nominee_id)
        .await?
    {
        return Err(AppError::Validation(
            "Votes can only be cast for finalists".to_string(),
        ));
    }

    let vote = state
        .repo
        .cast_vote(&current.staff.id, &category.id, &request.nominee_id)
        .await?;
    tracing::info!(voter_id = %current.staff.id, category_id = %category.id, "Vote recorded");
    success(vote)
}

/// GET /api/my-votes - The caller's current votes.
pub async fn my_votes(
    State(state): State<AppState>,
    current: CurrentStaff,
) -> ApiResult<Vec<Vote>> {
    success(state.repo.list_votes_by_voter(&current.staff.id).await?)
}

/// GET /api/admin/votes - All votes, optionally for one category.
pub async fn list_votes(
    State(state): State<AppState>,
    _admin: AdminStaff,
    Query(filter): Query<VoteFilter>,
) -> ApiResult<Vec<Vote>> {
    success(state.repo.list_votes(filter.category_id.as_deref()).await?)
}
