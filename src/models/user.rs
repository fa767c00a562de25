use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppError;

/// Role granted at registration. Corresponds to the `user_role` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }
}

/// A user row as stored in the `users` table. Never serialised directly, since it
/// carries the password hash; see [`UserProfile`].
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// Always stored lower-cased.
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub profile_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a user, returned by profile and user-management endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub profile_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            profile_image_url: user.profile_image_url.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Minimal user reference embedded in task detail responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub profile_image_url: Option<String>,
}

/// A user together with how many tasks are assigned to them, per status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserTaskCounts {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub profile_image_url: Option<String>,
    pub total_tasks: i64,
    pub pending_tasks: i64,
    pub in_progress_tasks: i64,
    pub completed_tasks: i64,
}

/// Input for inserting a user. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub profile_image_url: Option<String>,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub profile_image_url: Option<String>,
}

/// Lower-cases and trims an email so that uniqueness and lookups are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, profile_image_url, created_at, updated_at";

impl User {
    /// Inserts a user. A concurrent registration with the same email loses on the
    /// unique index and comes back as a duplicate-email conflict.
    pub async fn create(pool: &PgPool, data: NewUser) -> Result<Self, AppError> {
        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, role, profile_image_url) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(data.name)
            .bind(normalize_email(&data.email))
            .bind(data.password_hash)
            .bind(data.role)
            .bind(data.profile_image_url)
            .fetch_one(pool)
            .await?;

        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE LOWER(email) = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Whether `email` belongs to a user other than `except`.
    pub async fn email_taken(
        pool: &PgPool,
        email: &str,
        except: Option<Uuid>,
    ) -> Result<bool, AppError> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(normalize_email(email))
        .bind(except)
        .fetch_one(pool)
        .await?;

        Ok(taken)
    }

    pub async fn update(pool: &PgPool, id: Uuid, changes: UserChanges) -> Result<Self, AppError> {
        let sql = format!(
            "UPDATE users SET \
                name = COALESCE($2, name), \
                email = COALESCE($3, email), \
                password_hash = COALESCE($4, password_hash), \
                profile_image_url = COALESCE($5, profile_image_url), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.name)
            .bind(changes.email.as_deref().map(normalize_email))
            .bind(changes.password_hash)
            .bind(changes.profile_image_url)
            .fetch_optional(pool)
            .await?
            .ok_or_else(AppError::user_not_found)?;

        Ok(user)
    }

    pub async fn count(pool: &PgPool) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// Returns those of `ids` that do not resolve to a stored user.
    pub async fn missing_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Uuid>, AppError> {
        let found = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await?;

        Ok(ids.iter().copied().filter(|id| !found.contains(id)).collect())
    }

    pub async fn find_refs(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<UserRef>, AppError> {
        let refs = sqlx::query_as::<_, UserRef>(
            "SELECT id, name, email, profile_image_url FROM users WHERE id = ANY($1) ORDER BY name",
        )
        .bind(ids)
        .fetch_all(pool)
        .await?;

        Ok(refs)
    }

    /// Users with per-status counts of the tasks assigned to them, in one query.
    /// `role` narrows the listing; `None` returns everyone.
    pub async fn list_with_task_counts(
        pool: &PgPool,
        role: Option<Role>,
    ) -> Result<Vec<UserTaskCounts>, AppError> {
        let rows = sqlx::query_as::<_, UserTaskCounts>(
            "SELECT u.id, u.name, u.email, u.role, u.profile_image_url, \
                    COUNT(t.id) AS total_tasks, \
                    COUNT(t.id) FILTER (WHERE t.status = 'pending') AS pending_tasks, \
                    COUNT(t.id) FILTER (WHERE t.status = 'in_progress') AS in_progress_tasks, \
                    COUNT(t.id) FILTER (WHERE t.status = 'completed') AS completed_tasks \
             FROM users u \
             LEFT JOIN tasks t ON u.id = ANY(t.assigned_to) \
             WHERE ($1::user_role IS NULL OR u.role = $1) \
             GROUP BY u.id \
             ORDER BY u.name, u.email",
        )
        .bind(role)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }
}
