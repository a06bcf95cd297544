//! Portal feedback endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{created, require, success, ApiResult};
use crate::auth::{AdminStaff, MaybeStaff};
use crate::errors::AppError;
use crate::models::{
    looks_like_email, normalize_email, CreateFeedbackRequest, Feedback, FeedbackAuthor,
    FeedbackFilter, UpdateFeedbackRequest,
};
use crate::AppState;

/// POST /api/feedback - Submit feedback, signed in or not.
pub async fn submit_feedback(
    State(state): State<AppState>,
    MaybeStaff(staff): MaybeStaff,
    Json(request): Json<CreateFeedbackRequest>,
) -> ApiResult<Feedback> {
    require(&request.message, "Message")?;

    let author = match staff {
        Some(staff) => FeedbackAuthor {
            user_id: Some(staff.id),
            user_email: staff.email,
            user_name: Some(staff.name),
        },
        None => {
            let email = request.user_email.as_deref().map(normalize_email).unwrap_or_default();
            if !looks_like_email(&email) {
                return Err(AppError::Validation(
                    "An email is required to send feedback without signing in".to_string(),
                ));
            }
            FeedbackAuthor {
                user_id: None,
                user_email: email,
                user_name: request
                    .user_name
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty()),
            }
        }
    };

    let feedback = state
        .repo
        .create_feedback(&author, request.feedback_type, &request.message)
        .await?;
    tracing::info!(feedback_id = %feedback.id, kind = feedback.feedback_type.as_str(), "Feedback received");
    created(feedback)
}

/// GET /api/admin/feedback - List feedback, newest first.
pub async fn list_feedback(
    State(state): State<AppState>,
    _admin: AdminStaff,
    Query(filter): Query<FeedbackFilter>,
) -> ApiResult<Vec<Feedback>> {
    success(state.repo.list_feedback(&filter).await?)
}

/// PUT /api/admin/feedback/:id - Change a feedback item's status.
pub async fn update_feedback(
    State(state): State<AppState>,
    _admin: AdminStaff,
    Path(id): Path<String>,
    Json(request): Json<UpdateFeedbackRequest>,
) -> ApiResult<Feedback> {
    success(state.repo.update_feedback_status(&id, request.status).await?)
}

/// DELETE /api/admin/feedback/:id - Delete a feedback item.
pub async fn delete_feedback(
    State(state): State<AppState>,
    AdminStaff(admin): AdminStaff,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_feedback(&id).await?;
    tracing::info!(admin = %admin.id, feedback_id = %id, "Feedback deleted");
    success(())
}
