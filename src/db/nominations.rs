//! Nominations and finalist shortlisting.

use chrono::Utc;
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};

use super::Repository;
use crate::errors::AppError;
use crate::models::{
    CategoryStatus, CategorySummary, Finalist, Nomination, NominationDetail, NominationFilter,
    NominationStatus, StaffSummary, MAX_FINALISTS,
};

const NOMINATION_COLUMNS: &str = "id, nominee_id, nominator_id, category_id, reason, status, \
    is_finalist, submitted_at, created_at, updated_at";

const DETAIL_SELECT: &str = r#"
    SELECT n.id, n.nominee_id, n.nominator_id, n.category_id, n.reason, n.status, n.is_finalist,
           n.submitted_at, n.created_at, n.updated_at,
           e.name AS nominee_name, e.position AS nominee_position,
           e.department AS nominee_department, e.avatar AS nominee_avatar,
           r.name AS nominator_name, r.position AS nominator_position,
           r.department AS nominator_department, r.avatar AS nominator_avatar,
           c.title AS category_title, c.status AS category_status
    FROM nominations n
    JOIN staff e ON e.id = n.nominee_id
    LEFT JOIN staff r ON r.id = n.nominator_id
    JOIN categories c ON c.id = n.category_id
"#;

/// Outcome of a finalist selection batch.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FinalistSelection {
    /// Nominations newly promoted by this batch.
    pub promoted: usize,
    /// Finalists in the category after the batch.
    pub finalists: usize,
}

impl Repository {
    pub async fn create_nomination(
        &self,
        category_id: &str,
        nominee_id: &str,
        nominator_id: Option<&str>,
        reason: &str,
    ) -> Result<Nomination, AppError> {
        let now = Utc::now();
        let nomination = Nomination {
            id: uuid::Uuid::new_v4().to_string(),
            nominee_id: nominee_id.to_string(),
            nominator_id: nominator_id.map(str::to_string),
            category_id: category_id.to_string(),
            reason: reason.trim().to_string(),
            status: NominationStatus::Pending,
            is_finalist: false,
            submitted_at: now,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(&format!(
            "INSERT INTO nominations ({NOMINATION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&nomination.id)
        .bind(&nomination.nominee_id)
        .bind(&nomination.nominator_id)
        .bind(&nomination.category_id)
        .bind(&nomination.reason)
        .bind(nomination.status.as_str())
        .bind(nomination.is_finalist)
        .bind(nomination.submitted_at)
        .bind(nomination.created_at)
        .bind(nomination.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(nomination)
    }

    pub async fn get_nomination(&self, id: &str) -> Result<Option<Nomination>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {NOMINATION_COLUMNS} FROM nominations WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(nomination_from_row))
    }

    /// Every nomination, unjoined. Used by the analytics and results reducers.
    pub async fn list_all_nominations(&self) -> Result<Vec<Nomination>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {NOMINATION_COLUMNS} FROM nominations ORDER BY submitted_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(nomination_from_row).collect())
    }

    /// A nomination with its people and category. `viewer` decides `canCancel`.
    pub async fn get_nomination_detail(
        &self,
        id: &str,
        viewer: Option<&str>,
    ) -> Result<Option<NominationDetail>, AppError> {
        let row = sqlx::query(&format!("{DETAIL_SELECT} WHERE n.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| detail_from_row(&row, viewer)))
    }

    /// Filtered listing for the admin nominations page.
    pub async fn list_nominations(
        &self,
        filter: &NominationFilter,
    ) -> Result<Vec<NominationDetail>, AppError> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(DETAIL_SELECT);
        query.push(" WHERE 1 = 1");
        if let Some(status) = filter.status {
            query.push(" AND n.status = ").push_bind(status.as_str());
        }
        if let Some(category_id) = &filter.category_id {
            query.push(" AND n.category_id = ").push_bind(category_id);
        }
        if let Some(nominee_id) = &filter.nominee_id {
            query.push(" AND n.nominee_id = ").push_bind(nominee_id);
        }
        query.push(" ORDER BY n.submitted_at DESC");

        let rows = query.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(|row| detail_from_row(row, None)).collect())
    }

    /// Nominations submitted by one staff member ("My Nominations").
    pub async fn list_nominations_by_nominator(
        &self,
        nominator_id: &str,
    ) -> Result<Vec<NominationDetail>, AppError> {
        let rows = sqlx::query(&format!(
            "{DETAIL_SELECT} WHERE n.nominator_id = ? ORDER BY n.submitted_at DESC"
        ))
        .bind(nominator_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| detail_from_row(row, Some(nominator_id)))
            .collect())
    }

    /// All nominations of a category, finalists first.
    pub async fn list_category_nominations(
        &self,
        category_id: &str,
    ) -> Result<Vec<NominationDetail>, AppError> {
        let rows = sqlx::query(&format!(
            "{DETAIL_SELECT} WHERE n.category_id = ? ORDER BY n.is_finalist DESC, e.name"
        ))
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| detail_from_row(row, None)).collect())
    }

    /// Finalists of a category, by nominee name.
    pub async fn list_finalists(&self, category_id: &str) -> Result<Vec<Finalist>, AppError> {
        let rows = sqlx::query(&format!(
            "{DETAIL_SELECT} WHERE n.category_id = ? AND n.is_finalist = 1 ORDER BY e.name"
        ))
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Finalist::from(detail_from_row(row, None)))
            .collect())
    }

    /// Change a nomination's review status. Any status other than
    /// `shortlisted` also drops the finalist flag, keeping the two in step.
    pub async fn update_nomination_status(
        &self,
        id: &str,
        status: NominationStatus,
    ) -> Result<Nomination, AppError> {
        let is_finalist = status == NominationStatus::Shortlisted;
        let result = sqlx::query(
            "UPDATE nominations SET status = ?, is_finalist = CASE WHEN ? THEN is_finalist ELSE 0 END, updated_at = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(is_finalist)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Nomination {} not found", id)));
        }

        self.get_nomination(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Nomination {} not found", id)))
    }

    /// Withdraw a nomination on behalf of its nominator. Only pending
    /// nominations can be withdrawn; the condition is part of the DELETE.
    pub async fn cancel_nomination(&self, id: &str, nominator_id: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            "DELETE FROM nominations WHERE id = ? AND nominator_id = ? AND status = 'pending'",
        )
        .bind(id)
        .bind(nominator_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match self.get_nomination(id).await? {
            None => Err(AppError::NotFound(format!("Nomination {} not found", id))),
            Some(n) if n.nominator_id.as_deref() != Some(nominator_id) => Err(
                AppError::Forbidden("Only the nominator can cancel a nomination".to_string()),
            ),
            Some(n) => Err(AppError::Conflict {
                message: format!(
                    "Nomination can only be cancelled while pending (currently {})",
                    n.status.as_str()
                ),
                details: Some(serde_json::json!({ "status": n.status })),
            }),
        }
    }

    /// Delete a nomination outright (admin).
    pub async fn delete_nomination(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM nominations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Nomination {} not found", id)));
        }

        Ok(())
    }

    /// Promote nominations to finalists. The batch is applied inside one
    /// transaction and rolled back as a whole if the category would end up
    /// with more than [`MAX_FINALISTS`] finalists.
    pub async fn select_finalists(
        &self,
        category_id: &str,
        nomination_ids: &[String],
    ) -> Result<FinalistSelection, AppError> {
        let mut ids: Vec<&str> = nomination_ids.iter().map(String::as_str).collect();
        ids.sort_unstable();
        ids.dedup();

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut promoted = 0;

        // Writing first takes SQLite's write lock, so the count below sees
        // every concurrent selection.
        for id in &ids {
            let result = sqlx::query(
                r#"UPDATE nominations SET is_finalist = 1, status = 'shortlisted', updated_at = ?
                   WHERE id = ? AND category_id = ? AND is_finalist = 0 AND status != 'rejected'"#,
            )
            .bind(now)
            .bind(id)
            .bind(category_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 1 {
                promoted += 1;
                continue;
            }

            let row = sqlx::query(&format!(
                "SELECT {NOMINATION_COLUMNS} FROM nominations WHERE id = ?"
            ))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

            match row.as_ref().map(nomination_from_row) {
                None => {
                    return Err(AppError::NotFound(format!("Nomination {} not found", id)));
                }
                Some(n) if n.category_id != category_id => {
                    return Err(AppError::Validation(format!(
                        "Nomination {} belongs to a different category",
                        id
                    )));
                }
                Some(n) if n.is_finalist => {}
                Some(_) => {
                    return Err(AppError::Validation(format!(
                        "Nomination {} was rejected and cannot be a finalist",
                        id
                    )));
                }
            }
        }

        let (finalists,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM nominations WHERE category_id = ? AND is_finalist = 1",
        )
        .bind(category_id)
        .fetch_one(&mut *tx)
        .await?;
        let finalists = finalists as usize;

        if finalists > MAX_FINALISTS {
            // Dropping the transaction rolls the batch back.
            return Err(AppError::Conflict {
                message: format!(
                    "A category can have at most {} finalists ({} already selected, {} requested)",
                    MAX_FINALISTS,
                    finalists - promoted,
                    promoted
                ),
                details: Some(serde_json::json!({
                    "max": MAX_FINALISTS,
                    "current": finalists - promoted,
                    "requested": promoted,
                })),
            });
        }

        tx.commit().await?;

        tracing::info!(
            category_id,
            promoted,
            finalists,
            "Finalists selected"
        );

        Ok(FinalistSelection {
            promoted,
            finalists,
        })
    }

    /// Take a nomination off the shortlist. It returns to `approved`.
    pub async fn remove_finalist(&self, id: &str) -> Result<Nomination, AppError> {
        let result = sqlx::query(
            "UPDATE nominations SET is_finalist = 0, status = 'approved', updated_at = ? WHERE id = ? AND is_finalist = 1",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_nomination(id).await? {
                None => Err(AppError::NotFound(format!("Nomination {} not found", id))),
                Some(_) => Err(AppError::conflict(format!(
                    "Nomination {} is not a finalist",
                    id
                ))),
            };
        }

        self.get_nomination(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Nomination {} not found", id)))
    }

    /// Whether a staff member is a finalist in a category.
    pub async fn is_finalist(&self, category_id: &str, nominee_id: &str) -> Result<bool, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM nominations WHERE category_id = ? AND nominee_id = ? AND is_finalist = 1",
        )
        .bind(category_id)
        .bind(nominee_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }
}

pub(super) fn nomination_from_row(row: &SqliteRow) -> Nomination {
    let status: String = row.get("status");
    Nomination {
        id: row.get("id"),
        nominee_id: row.get("nominee_id"),
        nominator_id: row.get("nominator_id"),
        category_id: row.get("category_id"),
        reason: row.get("reason"),
        status: NominationStatus::parse(&status).unwrap_or_default(),
        is_finalist: row.get("is_finalist"),
        submitted_at: row.get("submitted_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn detail_from_row(row: &SqliteRow, viewer: Option<&str>) -> NominationDetail {
    let nomination = nomination_from_row(row);
    let category_status: String = row.get("category_status");

    let nominator = nomination.nominator_id.as_ref().and_then(|id| {
        let name: Option<String> = row.get("nominator_name");
        name.map(|name| StaffSummary {
            id: id.clone(),
            name,
            position: row.get::<Option<String>, _>("nominator_position").unwrap_or_default(),
            department: row
                .get::<Option<String>, _>("nominator_department")
                .unwrap_or_default(),
            avatar: row.get("nominator_avatar"),
        })
    });

    let can_cancel = nomination.status == NominationStatus::Pending
        && viewer.is_some()
        && nomination.nominator_id.as_deref() == viewer;

    NominationDetail {
        nominee: StaffSummary {
            id: nomination.nominee_id.clone(),
            name: row.get("nominee_name"),
            position: row.get("nominee_position"),
            department: row.get("nominee_department"),
            avatar: row.get("nominee_avatar"),
        },
        nominator,
        category: CategorySummary {
            id: nomination.category_id.clone(),
            title: row.get("category_title"),
            status: CategoryStatus::parse(&category_status).unwrap_or_default(),
        },
        can_cancel,
        nomination,
    }
}
