//! Portal feedback.

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};

use super::Repository;
use crate::errors::AppError;
use crate::models::{
    Feedback, FeedbackAuthor, FeedbackFilter, FeedbackStatus, FeedbackType,
};

impl Repository {
    pub async fn create_feedback(
        &self,
        author: &FeedbackAuthor,
        feedback_type: FeedbackType,
        message: &str,
    ) -> Result<Feedback, AppError> {
        let feedback = Feedback {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: author.user_id.clone(),
            user_email: author.user_email.clone(),
            user_name: author.user_name.clone(),
            feedback_type,
            message: message.trim().to_string(),
            status: FeedbackStatus::New,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO feedback (id, user_id, user_email, user_name, type, message, status, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&feedback.id)
        .bind(&feedback.user_id)
        .bind(&feedback.user_email)
        .bind(&feedback.user_name)
        .bind(feedback.feedback_type.as_str())
        .bind(&feedback.message)
        .bind(feedback.status.as_str())
        .bind(feedback.created_at)
        .execute(&self.pool)
        .await?;

        Ok(feedback)
    }

    /// Newest first, optionally filtered by status and type.
    pub async fn list_feedback(&self, filter: &FeedbackFilter) -> Result<Vec<Feedback>, AppError> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, user_id, user_email, user_name, type, message, status, created_at FROM feedback WHERE 1 = 1",
        );
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(feedback_type) = filter.feedback_type {
            query.push(" AND type = ").push_bind(feedback_type.as_str());
        }
        query.push(" ORDER BY created_at DESC");

        let rows = query.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(feedback_from_row).collect())
    }

    pub async fn update_feedback_status(
        &self,
        id: &str,
        status: FeedbackStatus,
    ) -> Result<Feedback, AppError> {
        let row = sqlx::query(
            "UPDATE feedback SET status = ? WHERE id = ? RETURNING id, user_id, user_email, user_name, type, message, status, created_at",
        )
        .bind(status.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(feedback_from_row)
            .ok_or_else(|| AppError::NotFound(format!("Feedback {} not found", id)))
    }

    pub async fn delete_feedback(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM feedback WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Feedback {} not found", id)));
        }

        Ok(())
    }
}

fn feedback_from_row(row: &SqliteRow) -> Feedback {
    let feedback_type: String = row.get("type");
    let status: String = row.get("status");
    Feedback {
        id: row.get("id"),
        user_id: row.get("user_id"),
        user_email: row.get("user_email"),
        user_name: row.get("user_name"),
        feedback_type: FeedbackType::parse(&feedback_type).unwrap_or(FeedbackType::Other),
        message: row.get("message"),
        status: FeedbackStatus::parse(&status).unwrap_or_default(),
        created_at: row.get("created_at"),
    }
}
