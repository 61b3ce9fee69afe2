use super::{DeletedCounts, DraftStore, WriteOp};
use crate::error::{StoreError, StoreResult};
use crate::models::{Badge, Bet, Draft, Event, EventStatus, Match, MatchStatus, Socials, User};
use crate::repositories::user_repository::{UserRow, USER_COLUMNS};
use crate::repositories::{BetRepository, EventRepository, MatchRepository, UserRepository};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

/// Clamped subtraction from the total and from a non-zero event score.
/// Binds: $1 user id, $2 amount, $3 event id.
const DECREMENT_SCORES_SQL: &str = r#"
    UPDATE users
    SET total_score = GREATEST(total_score - $2, 0),
        event_scores = CASE
            WHEN COALESCE((event_scores->>$3::text)::bigint, 0) <> 0 THEN jsonb_set(
                event_scores,
                ARRAY[$3::text],
                to_jsonb(GREATEST((event_scores->>$3::text)::bigint - $2, 0))
            )
            ELSE event_scores
        END
    WHERE id = $1
"#;

/// PostgreSQL-backed store. Plain reads and writes go through the per-table
/// repositories; aggregate primitives, batches and subtree deletes run in
/// their own transactions here.
pub struct PgDraftStore {
    pool: PgPool,
    events: EventRepository,
    matches: MatchRepository,
    bets: BetRepository,
    users: UserRepository,
}

impl PgDraftStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            events: EventRepository::new(pool.clone()),
            matches: MatchRepository::new(pool.clone()),
            bets: BetRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl DraftStore for PgDraftStore {
    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        self.events.create(event).await
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        self.events.find_by_id(id).await
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        self.events.find_all().await
    }

    async fn update_event_status(&self, id: Uuid, status: EventStatus) -> StoreResult<()> {
        self.events.update_status(id, status).await
    }

    async fn insert_match(&self, game: &Match) -> StoreResult<()> {
        self.matches.create(game).await
    }

    async fn find_match(&self, id: Uuid) -> StoreResult<Option<Match>> {
        self.matches.find_by_id(id).await
    }

    async fn list_matches(&self) -> StoreResult<Vec<Match>> {
        self.matches.find_all().await
    }

    async fn find_matches_by_event(&self, event_id: Uuid) -> StoreResult<Vec<Match>> {
        self.matches.find_by_event(event_id).await
    }

    async fn find_matches_by_series(
        &self,
        series_id: Uuid,
        status: Option<MatchStatus>,
    ) -> StoreResult<Vec<Match>> {
        self.matches.find_by_series(series_id, status).await
    }

    async fn update_match_status(&self, id: Uuid, status: MatchStatus) -> StoreResult<()> {
        self.matches.update_status(id, status).await
    }

    async fn insert_bet(&self, bet: &Bet) -> StoreResult<()> {
        self.bets.create(bet).await
    }

    async fn find_bet(&self, id: Uuid) -> StoreResult<Option<Bet>> {
        self.bets.find_by_id(id).await
    }

    async fn find_bets_by_match(&self, match_id: Uuid) -> StoreResult<Vec<Bet>> {
        self.bets.find_by_match(match_id).await
    }

    async fn find_bets_by_user(&self, user_id: &str) -> StoreResult<Vec<Bet>> {
        self.bets.find_by_user(user_id).await
    }

    async fn find_bet_for_user_and_match(
        &self,
        user_id: &str,
        match_id: Uuid,
    ) -> StoreResult<Option<Bet>> {
        self.bets.find_by_user_and_match(user_id, match_id).await
    }

    async fn update_bet_predictions(&self, bet_id: Uuid, predictions: &Draft) -> StoreResult<()> {
        self.bets.update_predictions(bet_id, predictions).await
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.users.create(user).await
    }

    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        self.users.find_by_id(id).await
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.users.find_by_username(username).await
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.users.find_all().await
    }

    async fn update_user_socials(&self, id: &str, socials: &Socials) -> StoreResult<()> {
        self.users.update_socials(id, socials).await
    }

    async fn append_badges(&self, id: &str, badges: &[Badge]) -> StoreResult<Vec<Badge>> {
        let mut tx = self.pool.begin().await?;

        let mut user = UserRepository::lock(&mut *tx, id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("User {}", id)))?;

        let before = user.badges.len();
        for badge in badges {
            if !user.has_badge(&badge.id) {
                user.badges.push(badge.clone());
            }
        }

        if user.badges.len() != before {
            sqlx::query("UPDATE users SET badges = $2 WHERE id = $1")
                .bind(id)
                .bind(Json(&user.badges))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(user.badges)
    }

    async fn increment_scores(&self, user_id: &str, event_id: Uuid, amount: i64) -> StoreResult<User> {
        let query = format!(
            r#"
            UPDATE users
            SET total_score = total_score + $2,
                event_scores = jsonb_set(
                    event_scores,
                    ARRAY[$3::text],
                    to_jsonb(COALESCE((event_scores->>$3::text)::bigint, 0) + $2)
                )
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(user_id)
            .bind(amount)
            .bind(event_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("User {}", user_id)))?;

        Ok(User::from(row))
    }

    async fn decrement_scores_clamped(
        &self,
        user_id: &str,
        event_id: Uuid,
        amount: i64,
    ) -> StoreResult<Option<User>> {
        let query = format!("{} RETURNING {}", DECREMENT_SCORES_SQL, USER_COLUMNS);

        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(user_id)
            .bind(amount)
            .bind(event_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(User::from))
    }

    async fn remove_event_score(&self, user_id: &str, event_id: Uuid) -> StoreResult<i64> {
        let mut tx = self.pool.begin().await?;

        let user = UserRepository::lock(&mut *tx, user_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("User {}", user_id)))?;
        let removed = user.event_score(event_id);

        sqlx::query(
            r#"
            UPDATE users
            SET total_score = GREATEST(total_score - $2, 0),
                event_scores = event_scores - $3::text
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(removed)
        .bind(event_id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(removed)
    }

    async fn adjust_total_score(&self, user_id: &str, delta: i64) -> StoreResult<User> {
        let query = format!(
            "UPDATE users SET total_score = GREATEST(total_score + $2, 0) WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );

        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(user_id)
            .bind(delta)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("User {}", user_id)))?;

        Ok(User::from(row))
    }

    async fn commit_batch(&self, ops: Vec<WriteOp>) -> StoreResult<()> {
        let op_count = ops.len();
        let mut tx = self.pool.begin().await?;

        for op in ops {
            let (result, target) = match op {
                WriteOp::CompleteMatch { match_id, result_draft } => {
                    let result = sqlx::query(
                        "UPDATE matches SET status = 'completed', result_draft = $2 WHERE id = $1",
                    )
                    .bind(match_id)
                    .bind(Json(&result_draft))
                    .execute(&mut *tx)
                    .await;
                    (result, format!("match {}", match_id))
                }
                WriteOp::ScoreBet { bet_id, score, is_perfect_score } => {
                    let result = sqlx::query(
                        r#"
                        UPDATE bets
                        SET score = $2, is_perfect_score = $3, status = 'scored'
                        WHERE id = $1
                        "#,
                    )
                    .bind(bet_id)
                    .bind(score)
                    .bind(is_perfect_score)
                    .execute(&mut *tx)
                    .await;
                    (result, format!("bet {}", bet_id))
                }
                WriteOp::ResetUserScores { user_id } => {
                    let result = sqlx::query(
                        "UPDATE users SET total_score = 0, event_scores = '{}'::jsonb WHERE id = $1",
                    )
                    .bind(&user_id)
                    .execute(&mut *tx)
                    .await;
                    (result, format!("user {}", user_id))
                }
                WriteOp::DecrementScores { user_id, event_id, amount } => {
                    let result = sqlx::query(DECREMENT_SCORES_SQL)
                        .bind(&user_id)
                        .bind(amount)
                        .bind(event_id.to_string())
                        .execute(&mut *tx)
                        .await;
                    (result, format!("user {}", user_id))
                }
                WriteOp::ResetBet { bet_id, predictions } => {
                    let result = sqlx::query(
                        r#"
                        UPDATE bets
                        SET predictions = $2, score = NULL, status = 'pending', is_perfect_score = FALSE
                        WHERE id = $1
                        "#,
                    )
                    .bind(bet_id)
                    .bind(Json(&predictions))
                    .execute(&mut *tx)
                    .await;
                    (result, format!("bet {}", bet_id))
                }
                WriteOp::DeleteBet { bet_id } => {
                    let result = sqlx::query("DELETE FROM bets WHERE id = $1")
                        .bind(bet_id)
                        .execute(&mut *tx)
                        .await;
                    (result, format!("bet {}", bet_id))
                }
            };

            // Returning drops `tx`, which rolls back everything written so far
            let affected = result
                .map_err(|e| StoreError::BatchAborted(format!("{}: {}", target, e)))?
                .rows_affected();
            if affected == 0 {
                warn!("Batch aborted, {} does not exist", target);
                return Err(StoreError::BatchAborted(format!("{} does not exist", target)));
            }
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::BatchAborted(format!("commit failed: {}", e)))?;
        debug!("Committed batch of {} writes", op_count);
        Ok(())
    }

    async fn delete_match_subtree(&self, match_id: Uuid) -> StoreResult<DeletedCounts> {
        let mut tx = self.pool.begin().await?;

        let bets = sqlx::query("DELETE FROM bets WHERE match_id = $1")
            .bind(match_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let matches = sqlx::query("DELETE FROM matches WHERE id = $1")
            .bind(match_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(DeletedCounts { events: 0, matches, bets })
    }

    async fn delete_event_subtree(&self, event_id: Uuid) -> StoreResult<DeletedCounts> {
        let mut tx = self.pool.begin().await?;

        let bets = sqlx::query(
            r#"
            DELETE FROM bets
            WHERE event_id = $1
               OR match_id IN (SELECT id FROM matches WHERE event_id = $1)
            "#,
        )
        .bind(event_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        let matches = sqlx::query("DELETE FROM matches WHERE event_id = $1")
            .bind(event_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let events = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(event_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(DeletedCounts { events, matches, bets })
    }
}
