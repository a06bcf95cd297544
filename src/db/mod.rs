//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all portal data. The invariants the
//! portal depends on (one vote per voter and category, unique emails and
//! department names, enum domains) are enforced by the schema itself.

mod categories;
mod departments;
mod feedback;
mod nominations;
mod sessions;
mod staff;
mod votes;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Database repository for all data operations, one file per table.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS staff (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            position TEXT NOT NULL DEFAULT '',
            department TEXT NOT NULL DEFAULT '',
            avatar TEXT,
            role TEXT NOT NULL DEFAULT 'staff' CHECK (role IN ('staff', 'admin')),
            password_hash TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS departments (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            image TEXT,
            type TEXT NOT NULL CHECK (type IN ('Individual Award', 'Team Award')),
            department TEXT,
            status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'published', 'closed')),
            nomination_deadline TEXT NOT NULL,
            shortlisting_start TEXT,
            shortlisting_end TEXT,
            voting_start TEXT,
            voting_end TEXT,
            winner_id TEXT REFERENCES staff(id) ON DELETE SET NULL,
            winner_published_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS nominations (
            id TEXT PRIMARY KEY,
            nominee_id TEXT NOT NULL REFERENCES staff(id),
            nominator_id TEXT REFERENCES staff(id),
            category_id TEXT NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
            reason TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'approved', 'rejected', 'shortlisted')),
            is_finalist INTEGER NOT NULL DEFAULT 0,
            submitted_at TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS votes (
            id TEXT PRIMARY KEY,
            voter_id TEXT NOT NULL REFERENCES staff(id),
            category_id TEXT NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
            nominee_id TEXT NOT NULL REFERENCES staff(id),
            voted_at TEXT NOT NULL,
            UNIQUE (voter_id, category_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS feedback (
            id TEXT PRIMARY KEY,
            user_id TEXT REFERENCES staff(id) ON DELETE SET NULL,
            user_email TEXT NOT NULL,
            user_name TEXT,
            type TEXT NOT NULL CHECK (type IN ('bug', 'feature', 'improvement', 'other')),
            message TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'new' CHECK (status IN ('new', 'reviewed', 'resolved')),
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            staff_id TEXT NOT NULL REFERENCES staff(id) ON DELETE CASCADE,
            secret_hash TEXT NOT NULL,
            method TEXT NOT NULL CHECK (method IN ('password', 'magic_link', 'google')),
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS magic_links (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            secret_hash TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            consumed_at TEXT
        );

        CREATE TABLE IF NOT EXISTS oauth_states (
            state TEXT PRIMARY KEY,
            next_path TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_staff_name ON staff(name);
        CREATE INDEX IF NOT EXISTS idx_categories_status ON categories(status);
        CREATE INDEX IF NOT EXISTS idx_nominations_category ON nominations(category_id, is_finalist);
        CREATE INDEX IF NOT EXISTS idx_nominations_nominator ON nominations(nominator_id);
        CREATE INDEX IF NOT EXISTS idx_nominations_nominee ON nominations(nominee_id);
        CREATE INDEX IF NOT EXISTS idx_votes_category ON votes(category_id);
        CREATE INDEX IF NOT EXISTS idx_feedback_status ON feedback(status);
        CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
