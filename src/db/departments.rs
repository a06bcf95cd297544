//! Department lookup table.

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use super::Repository;
use crate::errors::AppError;
use crate::models::{
    CreateDepartmentRequest, Department, DepartmentReferences, UpdateDepartmentRequest,
};

impl Repository {
    pub async fn list_departments(&self) -> Result<Vec<Department>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, description, created_at, updated_at, version FROM departments ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(department_from_row).collect())
    }

    pub async fn get_department(&self, id: &str) -> Result<Option<Department>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, description, created_at, updated_at, version FROM departments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(department_from_row))
    }

    /// Create a department. Names are unique; a duplicate is a conflict.
    pub async fn create_department(
        &self,
        request: &CreateDepartmentRequest,
    ) -> Result<Department, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let name = request.name.trim().to_string();

        sqlx::query(
            "INSERT INTO departments (id, name, description, created_at, updated_at, version) VALUES (?, ?, ?, ?, ?, 1)",
        )
        .bind(&id)
        .bind(&name)
        .bind(&request.description)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Department {
            id,
            name,
            description: request.description.clone(),
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }

    /// Update a department. A rename is carried over to the staff and
    /// category rows that name it, in the same transaction.
    pub async fn update_department(
        &self,
        id: &str,
        request: &UpdateDepartmentRequest,
    ) -> Result<Department, AppError> {
        let existing = self
            .get_department(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Department {} not found", id)))?;

        if let Some(expected) = request.expected_version {
            if existing.version != expected {
                return Err(AppError::VersionMismatch {
                    message: format!(
                        "Version mismatch: expected {}, current {}",
                        expected, existing.version
                    ),
                    current_version: existing.version,
                });
            }
        }

        let now = Utc::now();
        let new_version = existing.version + 1;
        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(&existing.name)
            .to_string();
        let description = request.description.clone().or(existing.description);

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE departments SET name = ?, description = ?, updated_at = ?, version = ? WHERE id = ? AND version = ?",
        )
        .bind(&name)
        .bind(&description)
        .bind(now)
        .bind(new_version)
        .bind(id)
        .bind(existing.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::VersionMismatch {
                message: "Concurrent modification detected".to_string(),
                current_version: existing.version,
            });
        }

        if name != existing.name {
            sqlx::query("UPDATE staff SET department = ?, updated_at = ? WHERE department = ?")
                .bind(&name)
                .bind(now)
                .bind(&existing.name)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "UPDATE categories SET department = ?, updated_at = ? WHERE department = ?",
            )
            .bind(&name)
            .bind(now)
            .bind(&existing.name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Department {
            id: id.to_string(),
            name,
            description,
            created_at: existing.created_at,
            updated_at: now,
            version: new_version,
        })
    }

    /// Count the staff and categories that still name a department.
    pub async fn department_references(&self, name: &str) -> Result<DepartmentReferences, AppError> {
        let (staff, categories): (i64, i64) = sqlx::query_as(
            r#"SELECT
                 (SELECT COUNT(*) FROM staff WHERE department = ?1),
                 (SELECT COUNT(*) FROM categories WHERE department = ?1)"#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(DepartmentReferences { staff, categories })
    }

    /// Delete a department that nothing refers to any more.
    pub async fn delete_department(&self, id: &str) -> Result<(), AppError> {
        let department = self
            .get_department(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Department {} not found", id)))?;

        let references = self.department_references(&department.name).await?;
        if !references.is_empty() {
            return Err(AppError::Conflict {
                message: format!("Department {} is still in use", department.name),
                details: Some(serde_json::to_value(references)?),
            });
        }

        let result = sqlx::query("DELETE FROM departments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Department {} not found", id)));
        }

        Ok(())
    }
}

fn department_from_row(row: &SqliteRow) -> Department {
    Department {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}
