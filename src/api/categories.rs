//! Category API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;

use super::{created, require, success, ApiResult};
use crate::auth::{AdminStaff, MaybeStaff};
use crate::errors::AppError;
use crate::models::{
    validate_windows, Category, CategoryQuery, CategoryStatus, CategoryView, CategoryVisibility,
    CreateCategoryRequest, Finalist, PublishWinnerRequest, UpdateCategoryRequest,
};
use crate::AppState;

/// Look up a category the caller is allowed to see. Drafts are hidden from
/// everyone but admins, and hidden means not found.
async fn visible_category(
    state: &AppState,
    viewer: &MaybeStaff,
    id: &str,
) -> Result<Category, AppError> {
    match state.repo.get_category(id).await? {
        Some(category) if category.status != CategoryStatus::Draft || viewer.is_admin() => {
            Ok(category)
        }
        _ => Err(AppError::NotFound(format!("Category {} not found", id))),
    }
}

/// GET /api/categories - List categories with their current phase.
pub async fn list_categories(
    State(state): State<AppState>,
    viewer: MaybeStaff,
    Query(query): Query<CategoryQuery>,
) -> ApiResult<Vec<CategoryView>> {
    let visibility = if viewer.is_admin() {
        query
            .status
            .map(CategoryVisibility::Status)
            .unwrap_or(CategoryVisibility::All)
    } else {
        CategoryVisibility::PublishedOnly
    };

    let now = Utc::now();
    let categories = state.repo.list_categories(visibility).await?;
    success(categories.into_iter().map(|c| c.view_at(now)).collect())
}

/// GET /api/categories/:id - Get a single category.
pub async fn get_category(
    State(state): State<AppState>,
    viewer: MaybeStaff,
    Path(id): Path<String>,
) -> ApiResult<CategoryView> {
    let category = visible_category(&state, &viewer, &id).await?;
    success(category.view_at(Utc::now()))
}

/// GET /api/categories/:id/finalists - Finalists open for voting.
pub async fn list_category_finalists(
    State(state): State<AppState>,
    viewer: MaybeStaff,
    Path(id): Path<String>,
) -> ApiResult<Vec<Finalist>> {
    let category = visible_category(&state, &viewer, &id).await?;
    success(state.repo.list_finalists(&category.id).await?)
}

/// POST /api/admin/categories - Create a category.
pub async fn create_category(
    State(state): State<AppState>,
    AdminStaff(admin): AdminStaff,
    Json(request): Json<CreateCategoryRequest>,
) -> ApiResult<CategoryView> {
    require(&request.title, "Title")?;
    validate_windows(
        request.nomination_deadline,
        request.voting_start,
        request.voting_end,
        request.shortlisting_start,
        request.shortlisting_end,
    )
    .map_err(AppError::Validation)?;

    let category = state.repo.create_category(&request).await?;
    tracing::info!(admin = %admin.id, category_id = %category.id, "Category created");
    created(category.view_at(Utc::now()))
}

/// PUT /api/admin/categories/:id - Update a category.
pub async fn update_category(
    State(state): State<AppState>,
    AdminStaff(admin): AdminStaff,
    Path(id): Path<String>,
    Json(request): Json<UpdateCategoryRequest>,
) -> ApiResult<CategoryView> {
    if let Some(title) = &request.title {
        require(title, "Title")?;
    }

    let existing = state
        .repo
        .get_category(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;
    let merged = request.apply_to(existing);
    validate_windows(
        merged.nomination_deadline,
        merged.voting_start,
        merged.voting_end,
        merged.shortlisting_start,
        merged.shortlisting_end,
    )
    .map_err(AppError::Validation)?;

    let category = state.repo.update_category(&id, &request).await?;
    tracing::info!(admin = %admin.id, category_id = %id, "Category updated");
    success(category.view_at(Utc::now()))
}

/// DELETE /api/admin/categories/:id - Delete a category and its nominations and votes.
pub async fn delete_category(
    State(state): State<AppState>,
    AdminStaff(admin): AdminStaff,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_category(&id).await?;
    tracing::info!(admin = %admin.id, category_id = %id, "Category deleted");
    success(())
}

/// POST /api/admin/categories/:id/winner - Announce the winner and close the category.
pub async fn publish_winner(
    State(state): State<AppState>,
    AdminStaff(admin): AdminStaff,
    Path(id): Path<String>,
    Json(request): Json<PublishWinnerRequest>,
) -> ApiResult<CategoryView> {
    require(&request.winner_id, "winnerId")?;

    let category = state.repo.publish_winner(&id, &request.winner_id).await?;
    tracing::info!(
        admin = %admin.id,
        category_id = %id,
        winner_id = %request.winner_id,
        "Winner published"
    );
    success(category.view_at(Utc::now()))
}
