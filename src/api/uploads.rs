//! Image upload endpoint.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap},
};

use super::{created, ApiResult};
use crate::auth::CurrentStaff;
use crate::errors::AppError;
use crate::models::{UploadBucket, UploadedImage};
use crate::AppState;

/// PUT /api/uploads/:bucket - Store a raw image body.
pub async fn upload_image(
    State(state): State<AppState>,
    current: CurrentStaff,
    Path(bucket): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<UploadedImage> {
    let bucket = UploadBucket::parse(&bucket)
        .ok_or_else(|| AppError::NotFound(format!("Unknown bucket {}", bucket)))?;
    if bucket.requires_admin() && !current.staff.is_admin() {
        return Err(AppError::Forbidden(
            "Only admins can upload category images".to_string(),
        ));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let image = state.images.store(bucket, content_type, &body).await?;
    tracing::info!(staff_id = %current.staff.id, bucket = bucket.as_str(), path = %image.path, "Image uploaded");
    created(image)
}
