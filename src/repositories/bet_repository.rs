use crate::error::{StoreError, StoreResult};
use crate::models::{Bet, Draft};
use chrono::NaiveDateTime;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

const BET_COLUMNS: &str =
    "id, user_id, match_id, event_id, predictions, score, status, is_perfect_score, created_at";

#[derive(sqlx::FromRow)]
struct BetRow {
    id: Uuid,
    user_id: String,
    match_id: Uuid,
    event_id: Uuid,
    predictions: Json<Draft>,
    score: Option<i64>,
    status: String,
    is_perfect_score: bool,
    created_at: NaiveDateTime,
}

impl TryFrom<BetRow> for Bet {
    type Error = StoreError;

    fn try_from(row: BetRow) -> Result<Self, Self::Error> {
        Ok(Bet {
            id: row.id,
            user_id: row.user_id,
            match_id: row.match_id,
            event_id: row.event_id,
            predictions: row.predictions.0,
            score: row.score,
            status: row.status.parse().map_err(StoreError::ConstraintViolation)?,
            is_perfect_score: row.is_perfect_score,
            created_at: row.created_at,
        })
    }
}

/// Repository for bet data access
pub struct BetRepository {
    pool: PgPool,
}

impl BetRepository {
    /// Create a new BetRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new bet
    pub async fn create(&self, bet: &Bet) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bets
                (id, user_id, match_id, event_id, predictions, score, status, is_perfect_score, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(bet.id)
        .bind(&bet.user_id)
        .bind(bet.match_id)
        .bind(bet.event_id)
        .bind(Json(&bet.predictions))
        .bind(bet.score)
        .bind(bet.status.as_str())
        .bind(bet.is_perfect_score)
        .bind(bet.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Find a bet by UUID
    pub async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Bet>> {
        let query = format!("SELECT {} FROM bets WHERE id = $1", BET_COLUMNS);
        let row = sqlx::query_as::<_, BetRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Bet::try_from).transpose()
    }

    /// Find all bets on a match
    pub async fn find_by_match(&self, match_id: Uuid) -> StoreResult<Vec<Bet>> {
        let query = format!(
            "SELECT {} FROM bets WHERE match_id = $1 ORDER BY created_at",
            BET_COLUMNS
        );
        let rows = sqlx::query_as::<_, BetRow>(&query)
            .bind(match_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Bet::try_from).collect()
    }

    /// Find all bets by a user, newest first
    pub async fn find_by_user(&self, user_id: &str) -> StoreResult<Vec<Bet>> {
        let query = format!(
            "SELECT {} FROM bets WHERE user_id = $1 ORDER BY created_at DESC",
            BET_COLUMNS
        );
        let rows = sqlx::query_as::<_, BetRow>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Bet::try_from).collect()
    }

    /// Find a user's bet on a specific match
    pub async fn find_by_user_and_match(
        &self,
        user_id: &str,
        match_id: Uuid,
    ) -> StoreResult<Option<Bet>> {
        let query = format!(
            "SELECT {} FROM bets WHERE user_id = $1 AND match_id = $2",
            BET_COLUMNS
        );
        let row = sqlx::query_as::<_, BetRow>(&query)
            .bind(user_id)
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Bet::try_from).transpose()
    }

    /// Replace predictions; the bet goes back to pending
    pub async fn update_predictions(&self, id: Uuid, predictions: &Draft) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE bets
            SET predictions = $2, score = NULL, status = 'pending', is_perfect_score = FALSE
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(Json(predictions))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Bet {}", id)));
        }
        Ok(())
    }
}
