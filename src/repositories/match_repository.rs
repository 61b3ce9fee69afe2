use crate::error::{StoreError, StoreResult};
use crate::models::{Draft, Match, MatchStatus};
use chrono::NaiveDateTime;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

const MATCH_COLUMNS: &str = "id, event_id, team1, team2, best_of, game_number, series_id, \
                             status, result_draft, created_at";

#[derive(sqlx::FromRow)]
struct MatchRow {
    id: Uuid,
    event_id: Uuid,
    team1: String,
    team2: String,
    best_of: String,
    game_number: i32,
    series_id: Option<Uuid>,
    status: String,
    result_draft: Option<Json<Draft>>,
    created_at: NaiveDateTime,
}

impl TryFrom<MatchRow> for Match {
    type Error = StoreError;

    fn try_from(row: MatchRow) -> Result<Self, Self::Error> {
        let game_number = u32::try_from(row.game_number)
            .map_err(|_| StoreError::ConstraintViolation(format!("game_number {}", row.game_number)))?;

        Ok(Match {
            id: row.id,
            event_id: row.event_id,
            team1: row.team1,
            team2: row.team2,
            best_of: row.best_of.parse().map_err(StoreError::ConstraintViolation)?,
            game_number,
            series_id: row.series_id,
            status: row.status.parse().map_err(StoreError::ConstraintViolation)?,
            result_draft: row.result_draft.map(|draft| draft.0),
            created_at: row.created_at,
        })
    }
}

/// Repository for match data access
pub struct MatchRepository {
    pool: PgPool,
}

impl MatchRepository {
    /// Create a new MatchRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new match
    pub async fn create(&self, game: &Match) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO matches
                (id, event_id, team1, team2, best_of, game_number, series_id, status, result_draft, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(game.id)
        .bind(game.event_id)
        .bind(&game.team1)
        .bind(&game.team2)
        .bind(game.best_of.as_str())
        .bind(game.game_number as i32)
        .bind(game.series_id)
        .bind(game.status.as_str())
        .bind(game.result_draft.as_ref().map(Json))
        .bind(game.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Find a match by UUID
    pub async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Match>> {
        let query = format!("SELECT {} FROM matches WHERE id = $1", MATCH_COLUMNS);
        let row = sqlx::query_as::<_, MatchRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Match::try_from).transpose()
    }

    /// All matches, newest first
    pub async fn find_all(&self) -> StoreResult<Vec<Match>> {
        let query = format!("SELECT {} FROM matches ORDER BY created_at DESC", MATCH_COLUMNS);
        let rows = sqlx::query_as::<_, MatchRow>(&query)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Match::try_from).collect()
    }

    /// Find all matches of an event, newest first
    pub async fn find_by_event(&self, event_id: Uuid) -> StoreResult<Vec<Match>> {
        let query = format!(
            "SELECT {} FROM matches WHERE event_id = $1 ORDER BY created_at DESC",
            MATCH_COLUMNS
        );
        let rows = sqlx::query_as::<_, MatchRow>(&query)
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Match::try_from).collect()
    }

    /// Games of a series in game order, optionally filtered by status
    pub async fn find_by_series(
        &self,
        series_id: Uuid,
        status: Option<MatchStatus>,
    ) -> StoreResult<Vec<Match>> {
        let query = format!(
            "SELECT {} FROM matches \
             WHERE series_id = $1 AND ($2::text IS NULL OR status = $2) \
             ORDER BY game_number",
            MATCH_COLUMNS
        );
        let rows = sqlx::query_as::<_, MatchRow>(&query)
            .bind(series_id)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Match::try_from).collect()
    }

    /// Update match status
    pub async fn update_status(&self, id: Uuid, status: MatchStatus) -> StoreResult<()> {
        let result = sqlx::query("UPDATE matches SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Match {}", id)));
        }
        Ok(())
    }
}
