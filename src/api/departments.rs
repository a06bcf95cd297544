//! Department API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{created, require, success, ApiResult};
use crate::auth::AdminStaff;
use crate::errors::AppError;
use crate::models::{CreateDepartmentRequest, Department, UpdateDepartmentRequest};
use crate::AppState;

/// GET /api/departments - List all departments.
pub async fn list_departments(State(state): State<AppState>) -> ApiResult<Vec<Department>> {
    success(state.repo.list_departments().await?)
}

/// POST /api/admin/departments - Create a department.
pub async fn create_department(
    State(state): State<AppState>,
    AdminStaff(admin): AdminStaff,
    Json(request): Json<CreateDepartmentRequest>,
) -> ApiResult<Department> {
    require(&request.name, "Name")?;

    let department = state.repo.create_department(&request).await?;
    tracing::info!(admin = %admin.id, name = %department.name, "Department created");
    created(department)
}

/// PUT /api/admin/departments/:id - Update a department. Renames carry over
/// to staff and categories.
pub async fn update_department(
    State(state): State<AppState>,
    AdminStaff(admin): AdminStaff,
    Path(id): Path<String>,
    Json(request): Json<UpdateDepartmentRequest>,
) -> ApiResult<Department> {
    if let Some(name) = &request.name {
        require(name, "Name")?;
    }

    let before = state
        .repo
        .get_department(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Department {} not found", id)))?;
    let department = state.repo.update_department(&id, &request).await?;

    if before.name != department.name {
        // Staff rows changed department text; refresh the directory.
        match state.repo.list_staff().await {
            Ok(staff) => {
                if let Err(e) = state.search.rebuild(&staff).await {
                    tracing::warn!("Failed to rebuild staff index: {}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to reload staff for reindex: {}", e),
        }
    }

    tracing::info!(admin = %admin.id, department_id = %id, "Department updated");
    success(department)
}

/// DELETE /api/admin/departments/:id - Delete an unused department.
pub async fn delete_department(
    State(state): State<AppState>,
    AdminStaff(admin): AdminStaff,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_department(&id).await?;
    tracing::info!(admin = %admin.id, department_id = %id, "Department deleted");
    success(())
}
