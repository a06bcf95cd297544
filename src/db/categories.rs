//! Award categories.

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use super::Repository;
use crate::errors::AppError;
use crate::models::{
    Category, CategoryStatus, CategoryType, CategoryVisibility, CreateCategoryRequest,
    UpdateCategoryRequest,
};

const CATEGORY_COLUMNS: &str = "id, title, description, image, type, department, status, \
    nomination_deadline, shortlisting_start, shortlisting_end, voting_start, voting_end, \
    winner_id, winner_published_at, created_at, updated_at, version";

impl Repository {
    /// List categories, soonest deadline first.
    pub async fn list_categories(
        &self,
        visibility: CategoryVisibility,
    ) -> Result<Vec<Category>, AppError> {
        let status = match visibility {
            CategoryVisibility::PublishedOnly => Some(CategoryStatus::Published),
            CategoryVisibility::Status(status) => Some(status),
            CategoryVisibility::All => None,
        };

        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {CATEGORY_COLUMNS} FROM categories WHERE status = ? ORDER BY nomination_deadline, title"
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY nomination_deadline, title"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(category_from_row).collect())
    }

    pub async fn get_category(&self, id: &str) -> Result<Option<Category>, AppError> {
        let row = sqlx::query(&format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(category_from_row))
    }

    /// Create a category. New categories start as drafts unless told otherwise.
    pub async fn create_category(
        &self,
        request: &CreateCategoryRequest,
    ) -> Result<Category, AppError> {
        let now = Utc::now();
        let category = Category {
            id: uuid::Uuid::new_v4().to_string(),
            title: request.title.trim().to_string(),
            description: request.description.clone(),
            image: request.image.clone(),
            category_type: request.category_type,
            department: request.department.clone(),
            status: request.status.unwrap_or_default(),
            nomination_deadline: request.nomination_deadline,
            shortlisting_start: request.shortlisting_start,
            shortlisting_end: request.shortlisting_end,
            voting_start: request.voting_start,
            voting_end: request.voting_end,
            winner_id: None,
            winner_published_at: None,
            created_at: now,
            updated_at: now,
            version: 1,
        };

        sqlx::query(&format!(
            "INSERT INTO categories ({CATEGORY_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&category.id)
        .bind(&category.title)
        .bind(&category.description)
        .bind(&category.image)
        .bind(category.category_type.as_str())
        .bind(&category.department)
        .bind(category.status.as_str())
        .bind(category.nomination_deadline)
        .bind(category.shortlisting_start)
        .bind(category.shortlisting_end)
        .bind(category.voting_start)
        .bind(category.voting_end)
        .bind(&category.winner_id)
        .bind(category.winner_published_at)
        .bind(category.created_at)
        .bind(category.updated_at)
        .bind(category.version)
        .execute(&self.pool)
        .await?;

        Ok(category)
    }

    /// Update a category with optimistic concurrency control.
    pub async fn update_category(
        &self,
        id: &str,
        request: &UpdateCategoryRequest,
    ) -> Result<Category, AppError> {
        let existing = self
            .get_category(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;

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

        let updated = Category {
            updated_at: Utc::now(),
            version: existing.version + 1,
            ..request.apply_to(existing)
        };

        let result = sqlx::query(
            r#"UPDATE categories SET title = ?, description = ?, image = ?, type = ?, department = ?,
                      status = ?, nomination_deadline = ?, shortlisting_start = ?, shortlisting_end = ?,
                      voting_start = ?, voting_end = ?, winner_id = ?, winner_published_at = ?,
                      updated_at = ?, version = ?
               WHERE id = ? AND version = ?"#,
        )
        .bind(&updated.title)
        .bind(&updated.description)
        .bind(&updated.image)
        .bind(updated.category_type.as_str())
        .bind(&updated.department)
        .bind(updated.status.as_str())
        .bind(updated.nomination_deadline)
        .bind(updated.shortlisting_start)
        .bind(updated.shortlisting_end)
        .bind(updated.voting_start)
        .bind(updated.voting_end)
        .bind(&updated.winner_id)
        .bind(updated.winner_published_at)
        .bind(updated.updated_at)
        .bind(updated.version)
        .bind(id)
        .bind(updated.version - 1)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_category(id).await?;
            return Err(AppError::VersionMismatch {
                message: "Concurrent modification detected".to_string(),
                current_version: current.map(|c| c.version).unwrap_or(0),
            });
        }

        Ok(updated)
    }

    /// Delete a category. Its nominations and votes go with it.
    pub async fn delete_category(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Category {} not found", id)));
        }

        Ok(())
    }

    /// Publish the winner of a category and close it. The winner must be one
    /// of the category's finalists; the check and the write share a statement.
    pub async fn publish_winner(
        &self,
        category_id: &str,
        winner_id: &str,
    ) -> Result<Category, AppError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"UPDATE categories
               SET winner_id = ?1, winner_published_at = ?2, status = 'closed',
                   updated_at = ?2, version = version + 1
               WHERE id = ?3
                 AND EXISTS (SELECT 1 FROM nominations
                             WHERE category_id = ?3 AND nominee_id = ?1 AND is_finalist = 1)"#,
        )
        .bind(winner_id)
        .bind(now)
        .bind(category_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_category(category_id).await? {
                None => Err(AppError::NotFound(format!("Category {} not found", category_id))),
                Some(_) => Err(AppError::Validation(format!(
                    "Staff member {} is not a finalist in this category",
                    winner_id
                ))),
            };
        }

        self.get_category(category_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", category_id)))
    }
}

pub(super) fn category_from_row(row: &SqliteRow) -> Category {
    let category_type: String = row.get("type");
    let status: String = row.get("status");
    Category {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        image: row.get("image"),
        category_type: CategoryType::parse(&category_type).unwrap_or_default(),
        department: row.get("department"),
        status: CategoryStatus::parse(&status).unwrap_or_default(),
        nomination_deadline: row.get("nomination_deadline"),
        shortlisting_start: row.get("shortlisting_start"),
        shortlisting_end: row.get("shortlisting_end"),
        voting_start: row.get("voting_start"),
        voting_end: row.get("voting_end"),
        winner_id: row.get("winner_id"),
        winner_published_at: row.get("winner_published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}
