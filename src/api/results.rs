//! Results endpoints: public winners, admin tallies and the CSV download.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use super::{success, ApiResult};
use crate::auth::AdminStaff;
use crate::errors::AppError;
use crate::models::CategoryVisibility;
use crate::results::{self, CategoryTally, PublishedResult};
use crate::AppState;

const EXPORT_FILENAME: &str = "award-results.csv";

async fn load_tallies(state: &AppState) -> Result<Vec<CategoryTally>, AppError> {
    let categories = state.repo.list_categories(CategoryVisibility::All).await?;
    let nominations = state.repo.list_all_nominations().await?;
    let counts = state.repo.vote_counts().await?;
    let staff = state.repo.list_staff().await?;
    Ok(results::tally(&categories, &nominations, &counts, &staff))
}

/// GET /api/results - Announced winners.
pub async fn public_results(State(state): State<AppState>) -> ApiResult<Vec<PublishedResult>> {
    let categories = state.repo.list_categories(CategoryVisibility::All).await?;
    let counts = state.repo.vote_counts().await?;
    let staff = state.repo.list_staff().await?;
    success(results::published_results(&categories, &counts, &staff))
}

/// GET /api/admin/results - Standings for every category.
pub async fn admin_results(
    State(state): State<AppState>,
    _admin: AdminStaff,
) -> ApiResult<Vec<CategoryTally>> {
    success(load_tallies(&state).await?)
}

/// GET /api/admin/results/export - Standings as a CSV download.
pub async fn export_results(
    State(state): State<AppState>,
    AdminStaff(admin): AdminStaff,
) -> Result<Response, AppError> {
    let csv = results::to_csv(&load_tallies(&state).await?)?;
    tracing::info!(admin = %admin.id, bytes = csv.len(), "Results exported");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILENAME),
            ),
        ],
        csv,
    )
        .into_response())
}
