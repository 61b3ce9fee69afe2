use crate::error::{StoreError, StoreResult};
use crate::models::{Badge, Socials, User};
use chrono::NaiveDateTime;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

pub(crate) const USER_COLUMNS: &str =
    "id, username, email, total_score, event_scores, is_admin, badges, socials, created_at";

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    id: String,
    username: String,
    email: String,
    total_score: i64,
    event_scores: Json<HashMap<Uuid, i64>>,
    is_admin: bool,
    badges: Json<Vec<Badge>>,
    socials: Json<Socials>,
    created_at: NaiveDateTime,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            total_score: row.total_score,
            event_scores: row.event_scores.0,
            is_admin: row.is_admin,
            badges: row.badges.0,
            socials: row.socials.0,
            created_at: row.created_at,
        }
    }
}

/// Repository for user data access
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new UserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new user
    pub async fn create(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, username, email, total_score, event_scores, is_admin, badges, socials, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.total_score)
        .bind(Json(&user.event_scores))
        .bind(user.is_admin)
        .bind(Json(&user.badges))
        .bind(Json(&user.socials))
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Find a user by id
    pub async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(User::from))
    }

    /// Find a user by username
    pub async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(User::from))
    }

    /// All users ordered by id
    pub async fn find_all(&self) -> StoreResult<Vec<User>> {
        let query = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        let rows = sqlx::query_as::<_, UserRow>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Replace the social handles
    pub async fn update_socials(&self, id: &str, socials: &Socials) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET socials = $2 WHERE id = $1")
            .bind(id)
            .bind(Json(socials))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("User {}", id)));
        }
        Ok(())
    }

    /// Lock a user row for the rest of the transaction
    pub(crate) async fn lock(conn: &mut PgConnection, id: &str) -> StoreResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = $1 FOR UPDATE", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(row.map(User::from))
    }
}
