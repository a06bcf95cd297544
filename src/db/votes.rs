//! Votes.

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use super::Repository;
use crate::errors::AppError;
use crate::models::{Vote, VoteCount};

impl Repository {
    /// Record a voter's choice in a category, replacing any earlier choice.
    ///
    /// The `(voter_id, category_id)` unique key turns a second vote into an
    /// update of the first; the vote keeps its id and gets a new `voted_at`.
    pub async fn cast_vote(
        &self,
        voter_id: &str,
        category_id: &str,
        nominee_id: &str,
    ) -> Result<Vote, AppError> {
        let row = sqlx::query(
            r#"INSERT INTO votes (id, voter_id, category_id, nominee_id, voted_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT (voter_id, category_id)
               DO UPDATE SET nominee_id = excluded.nominee_id, voted_at = excluded.voted_at
               RETURNING id, voter_id, category_id, nominee_id, voted_at"#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(voter_id)
        .bind(category_id)
        .bind(nominee_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(vote_from_row(&row))
    }

    /// List votes, optionally restricted to one category.
    pub async fn list_votes(&self, category_id: Option<&str>) -> Result<Vec<Vote>, AppError> {
        let rows = match category_id {
            Some(category_id) => {
                sqlx::query(
                    "SELECT id, voter_id, category_id, nominee_id, voted_at FROM votes WHERE category_id = ? ORDER BY voted_at DESC",
                )
                .bind(category_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, voter_id, category_id, nominee_id, voted_at FROM votes ORDER BY voted_at DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(vote_from_row).collect())
    }

    pub async fn list_votes_by_voter(&self, voter_id: &str) -> Result<Vec<Vote>, AppError> {
        let rows = sqlx::query(
            "SELECT id, voter_id, category_id, nominee_id, voted_at FROM votes WHERE voter_id = ? ORDER BY voted_at DESC",
        )
        .bind(voter_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(vote_from_row).collect())
    }

    /// Vote totals per (category, nominee).
    pub async fn vote_counts(&self) -> Result<Vec<VoteCount>, AppError> {
        let rows = sqlx::query(
            "SELECT category_id, nominee_id, COUNT(*) AS votes FROM votes GROUP BY category_id, nominee_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| VoteCount {
                category_id: row.get("category_id"),
                nominee_id: row.get("nominee_id"),
                votes: row.get("votes"),
            })
            .collect())
    }
}

fn vote_from_row(row: &SqliteRow) -> Vote {
    Vote {
        id: row.get("id"),
        voter_id: row.get("voter_id"),
        category_id: row.get("category_id"),
        nominee_id: row.get("nominee_id"),
        voted_at: row.get("voted_at"),
    }
}
