//! REST API module.
//!
//! Handlers grouped by resource. Every JSON response uses the
//! `{success, data}` / `{success, error}` envelope.

mod analytics;
mod auth;
mod categories;
mod departments;
mod feedback;
mod nominations;
mod results;
mod staff;
mod uploads;
mod votes;

pub use analytics::*;
pub use auth::*;
pub use categories::*;
pub use departments::*;
pub use feedback::*;
pub use nominations::*;
pub use results::*;
pub use staff::*;
pub use uploads::*;
pub use votes::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            status: StatusCode::OK,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::new(data)
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Create a `201 Created` API response.
pub fn created<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::created(data))
}

/// Reject blank required text fields.
pub(crate) fn require(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Keep the directory index in step with a staff write. Best effort.
pub(crate) async fn reindex_staff(state: &crate::AppState, staff: &crate::models::Staff) {
    if let Err(e) = state.search.index_staff(staff).await {
        tracing::warn!("Failed to index staff member {}: {}", staff.id, e);
    }
}
