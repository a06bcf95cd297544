//! Sessions, magic links and OAuth CSRF states.

use chrono::{DateTime, Duration, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use super::Repository;
use crate::errors::AppError;
use crate::models::{AuthMethod, MagicLinkRecord, SessionRecord};

/// How long an OAuth round trip may take before its state is discarded.
const OAUTH_STATE_TTL_MINUTES: i64 = 10;

impl Repository {
    pub async fn create_session(
        &self,
        id: &str,
        staff_id: &str,
        secret_hash: &str,
        method: AuthMethod,
        expires_at: DateTime<Utc>,
    ) -> Result<SessionRecord, AppError> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO sessions (id, staff_id, secret_hash, method, created_at, expires_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(staff_id)
        .bind(secret_hash)
        .bind(method.as_str())
        .bind(now)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(SessionRecord {
            id: id.to_string(),
            staff_id: staff_id.to_string(),
            secret_hash: secret_hash.to_string(),
            method,
            created_at: now,
            expires_at,
        })
    }

    pub async fn get_session(&self, id: &str) -> Result<Option<SessionRecord>, AppError> {
        let row = sqlx::query(
            "SELECT id, staff_id, secret_hash, method, created_at, expires_at FROM sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(session_from_row))
    }

    pub async fn delete_session(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn create_magic_link(
        &self,
        id: &str,
        email: &str,
        secret_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO magic_links (id, email, secret_hash, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(email)
        .bind(secret_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_magic_link(&self, id: &str) -> Result<Option<MagicLinkRecord>, AppError> {
        let row = sqlx::query(
            "SELECT id, email, secret_hash, expires_at, consumed_at FROM magic_links WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| MagicLinkRecord {
            id: row.get("id"),
            email: row.get("email"),
            secret_hash: row.get("secret_hash"),
            expires_at: row.get("expires_at"),
            consumed_at: row.get("consumed_at"),
        }))
    }

    /// Mark a magic link used. Returns false if someone else got there first.
    pub async fn consume_magic_link(&self, id: &str) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE magic_links SET consumed_at = ? WHERE id = ? AND consumed_at IS NULL")
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn create_oauth_state(
        &self,
        state: &str,
        next_path: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO oauth_states (state, next_path, created_at) VALUES (?, ?, ?)")
            .bind(state)
            .bind(next_path)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Consume an OAuth state. `Some(next_path)` when it existed and was fresh.
    pub async fn take_oauth_state(&self, state: &str) -> Result<Option<Option<String>>, AppError> {
        let row = sqlx::query("DELETE FROM oauth_states WHERE state = ? RETURNING next_path, created_at")
            .bind(state)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.and_then(|row| {
            let created_at: DateTime<Utc> = row.get("created_at");
            if Utc::now() - created_at > Duration::minutes(OAUTH_STATE_TTL_MINUTES) {
                None
            } else {
                Some(row.get("next_path"))
            }
        }))
    }

    /// Drop expired sessions, magic links and OAuth states. Returns rows removed.
    pub async fn purge_expired_sessions(&self) -> Result<u64, AppError> {
        let now = Utc::now();
        let sessions = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        let links = sqlx::query("DELETE FROM magic_links WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        let states = sqlx::query("DELETE FROM oauth_states WHERE created_at < ?")
            .bind(now - Duration::minutes(OAUTH_STATE_TTL_MINUTES))
            .execute(&self.pool)
            .await?;

        Ok(sessions.rows_affected() + links.rows_affected() + states.rows_affected())
    }
}

fn session_from_row(row: &SqliteRow) -> SessionRecord {
    let method: String = row.get("method");
    SessionRecord {
        id: row.get("id"),
        staff_id: row.get("staff_id"),
        secret_hash: row.get("secret_hash"),
        method: AuthMethod::parse(&method).unwrap_or(AuthMethod::Password),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    }
}
