//! Staff records.

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use super::Repository;
use crate::errors::AppError;
use crate::models::{normalize_email, CreateStaffRequest, Staff, StaffRole, UpdateStaffRequest};

const STAFF_COLUMNS: &str =
    "id, name, email, position, department, avatar, role, created_at, updated_at, version";

impl Repository {
    /// List all staff, ordered by name.
    pub async fn list_staff(&self) -> Result<Vec<Staff>, AppError> {
        let rows = sqlx::query(&format!("SELECT {STAFF_COLUMNS} FROM staff ORDER BY name"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(staff_from_row).collect())
    }

    /// Get a staff member by ID.
    pub async fn get_staff(&self, id: &str) -> Result<Option<Staff>, AppError> {
        let row = sqlx::query(&format!("SELECT {STAFF_COLUMNS} FROM staff WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(staff_from_row))
    }

    pub async fn find_staff_by_email(&self, email: &str) -> Result<Option<Staff>, AppError> {
        let row = sqlx::query(&format!("SELECT {STAFF_COLUMNS} FROM staff WHERE email = ?"))
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(staff_from_row))
    }

    /// Fetch a staff member together with their password hash, if any.
    pub async fn get_staff_credentials(
        &self,
        email: &str,
    ) -> Result<Option<(Staff, Option<String>)>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {STAFF_COLUMNS}, password_hash FROM staff WHERE email = ?"
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| (staff_from_row(&row), row.get("password_hash"))))
    }

    /// Create a new staff record. Duplicate emails surface as a conflict.
    pub async fn create_staff(&self, request: &CreateStaffRequest) -> Result<Staff, AppError> {
        self.insert_staff(request, None).await
    }

    /// Create a staff record that can sign in with a password.
    pub async fn create_staff_with_password(
        &self,
        request: &CreateStaffRequest,
        password_hash: &str,
    ) -> Result<Staff, AppError> {
        self.insert_staff(request, Some(password_hash)).await
    }

    async fn insert_staff(
        &self,
        request: &CreateStaffRequest,
        password_hash: Option<&str>,
    ) -> Result<Staff, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let email = normalize_email(&request.email);
        let role = request.role.unwrap_or_default();

        sqlx::query(
            "INSERT INTO staff (id, name, email, position, department, avatar, role, password_hash, created_at, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)"
        )
        .bind(&id)
        .bind(request.name.trim())
        .bind(&email)
        .bind(request.position.trim())
        .bind(request.department.trim())
        .bind(&request.avatar)
        .bind(role.as_str())
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Staff {
            id,
            name: request.name.trim().to_string(),
            email,
            position: request.position.trim().to_string(),
            department: request.department.trim().to_string(),
            avatar: request.avatar.clone().flatten(),
            role,
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }

    /// Swap the stored password hash, provided it is still `current_hash`
    /// (`None` for a record without a password). Returns false when another
    /// writer got there first.
    pub async fn replace_staff_password(
        &self,
        id: &str,
        current_hash: Option<&str>,
        password_hash: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE staff SET password_hash = ?, updated_at = ?, version = version + 1 WHERE id = ? AND password_hash IS ?",
        )
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .bind(current_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Find a staff member by email or create one, used by the sign-in flows
    /// and by nominations of people without a record yet.
    pub async fn ensure_staff(&self, request: &CreateStaffRequest) -> Result<Staff, AppError> {
        if let Some(existing) = self.find_staff_by_email(&request.email).await? {
            return Ok(existing);
        }

        match self.create_staff(request).await {
            Ok(staff) => Ok(staff),
            // Lost a race with another insert of the same email.
            Err(AppError::Conflict { .. }) => self
                .find_staff_by_email(&request.email)
                .await?
                .ok_or_else(|| AppError::Internal("Staff record vanished".to_string())),
            Err(e) => Err(e),
        }
    }

    /// Update a staff member with optimistic concurrency control.
    pub async fn update_staff(
        &self,
        id: &str,
        request: &UpdateStaffRequest,
    ) -> Result<Staff, AppError> {
        let existing = self
            .get_staff(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Staff member {} not found", id)))?;

        // Check version for optimistic concurrency
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
        let email = request
            .email
            .as_deref()
            .map(normalize_email)
            .unwrap_or(existing.email);
        let position = request
            .position
            .as_deref()
            .map(str::trim)
            .unwrap_or(&existing.position)
            .to_string();
        let department = request
            .department
            .as_deref()
            .map(str::trim)
            .unwrap_or(&existing.department)
            .to_string();
        let avatar = request.avatar.clone().unwrap_or(existing.avatar);
        let role = request.role.unwrap_or(existing.role);

        // Use conditional UPDATE with version check to prevent race conditions
        let result = sqlx::query(
            "UPDATE staff SET name = ?, email = ?, position = ?, department = ?, avatar = ?, role = ?, updated_at = ?, version = ? WHERE id = ? AND version = ?"
        )
        .bind(&name)
        .bind(&email)
        .bind(&position)
        .bind(&department)
        .bind(&avatar)
        .bind(role.as_str())
        .bind(now)
        .bind(new_version)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Race condition - version changed between read and write
            let current = self.get_staff(id).await?;
            return Err(AppError::VersionMismatch {
                message: "Concurrent modification detected".to_string(),
                current_version: current.map(|s| s.version).unwrap_or(0),
            });
        }

        Ok(Staff {
            id: id.to_string(),
            name,
            email,
            position,
            department,
            avatar,
            role,
            created_at: existing.created_at,
            updated_at: now,
            version: new_version,
        })
    }

    /// Delete a staff member. Refused while nominations or votes refer to them.
    pub async fn delete_staff(&self, id: &str) -> Result<(), AppError> {
        let (nominations, votes): (i64, i64) = sqlx::query_as(
            r#"SELECT
                 (SELECT COUNT(*) FROM nominations WHERE nominee_id = ?1 OR nominator_id = ?1),
                 (SELECT COUNT(*) FROM votes WHERE voter_id = ?1 OR nominee_id = ?1)"#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if nominations > 0 || votes > 0 {
            return Err(AppError::Conflict {
                message: format!("Staff member {} is referenced by nominations or votes", id),
                details: Some(serde_json::json!({ "nominations": nominations, "votes": votes })),
            });
        }

        // A nomination or vote slipped in after the count still surfaces as a
        // conflict through the foreign key.
        let result = sqlx::query("DELETE FROM staff WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Staff member {} not found", id)));
        }

        Ok(())
    }

    pub async fn count_staff(&self) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM staff")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

pub(super) fn staff_from_row(row: &SqliteRow) -> Staff {
    let role: String = row.get("role");
    Staff {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        position: row.get("position"),
        department: row.get("department"),
        avatar: row.get("avatar"),
        role: StaffRole::parse(&role).unwrap_or_default(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}
