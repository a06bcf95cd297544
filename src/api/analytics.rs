//! Admin dashboard and analytics endpoints.

use axum::extract::State;

use super::{success, ApiResult};
use crate::analytics::{self, Analytics, Dashboard, Snapshot, RECENT_NOMINATIONS};
use crate::auth::AdminStaff;
use crate::errors::AppError;
use crate::models::{
    Category, CategoryVisibility, Department, FeedbackFilter, Nomination, NominationFilter,
    Staff, Vote,
};
use crate::AppState;

/// Full row sets behind a [`Snapshot`].
struct Rows {
    staff: Vec<Staff>,
    departments: Vec<Department>,
    categories: Vec<Category>,
    nominations: Vec<Nomination>,
    votes: Vec<Vote>,
    feedback: usize,
}

impl Rows {
    async fn load(state: &AppState) -> Result<Self, AppError> {
        Ok(Rows {
            staff: state.repo.list_staff().await?,
            departments: state.repo.list_departments().await?,
            categories: state.repo.list_categories(CategoryVisibility::All).await?,
            nominations: state.repo.list_all_nominations().await?,
            votes: state.repo.list_votes(None).await?,
            feedback: state
                .repo
                .list_feedback(&FeedbackFilter::default())
                .await?
                .len(),
        })
    }

    fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            staff: &self.staff,
            departments: &self.departments,
            categories: &self.categories,
            nominations: &self.nominations,
            votes: &self.votes,
            feedback: self.feedback,
        }
    }
}

/// GET /api/admin/dashboard - Headline numbers and the latest nominations.
pub async fn get_dashboard(
    State(state): State<AppState>,
    _admin: AdminStaff,
) -> ApiResult<Dashboard> {
    let rows = Rows::load(&state).await?;
    let mut recent = state
        .repo
        .list_nominations(&NominationFilter::default())
        .await?;
    recent.truncate(RECENT_NOMINATIONS);
    success(analytics::dashboard(&rows.snapshot(), recent))
}

/// GET /api/admin/analytics - Full analytics breakdown.
pub async fn get_analytics(
    State(state): State<AppState>,
    _admin: AdminStaff,
) -> ApiResult<Analytics> {
    let rows = Rows::load(&state).await?;
    success(analytics::analyze(&rows.snapshot()))
}
