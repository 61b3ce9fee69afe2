use crate::error::{StoreError, StoreResult};
use crate::models::{Event, EventStatus};
use chrono::NaiveDateTime;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    name: String,
    description: String,
    status: String,
    created_at: NaiveDateTime,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Event {
            id: row.id,
            name: row.name,
            description: row.description,
            status: row.status.parse().map_err(StoreError::ConstraintViolation)?,
            created_at: row.created_at,
        })
    }
}

/// Repository for event data access
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    /// Create a new EventRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new event
    pub async fn create(&self, event: &Event) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO events (id, name, description, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.status.as_str())
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Find an event by UUID
    pub async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, name, description, status, created_at
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Event::try_from).transpose()
    }

    /// All events, newest first
    pub async fn find_all(&self) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, name, description, status, created_at
            FROM events
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Event::try_from).collect()
    }

    /// Update event status
    pub async fn update_status(&self, id: Uuid, status: EventStatus) -> StoreResult<()> {
        let result = sqlx::query("UPDATE events SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Event {}", id)));
        }
        Ok(())
    }
}
