//! Document-store abstraction used by the services.
//!
//! `PgDraftStore` backs production; `MemoryDraftStore` backs development mode
//! and the test suite. Both honor the same atomicity contract: `commit_batch`
//! is all-or-nothing, the score primitives are atomic per user, and the
//! subtree deletes remove a match or event together with everything under it.

pub mod memory;
pub mod postgres;

pub use memory::MemoryDraftStore;
pub use postgres::PgDraftStore;

use crate::error::StoreResult;
use crate::models::{Badge, Bet, Draft, Event, EventStatus, Match, MatchStatus, Socials, User};
use async_trait::async_trait;
use uuid::Uuid;

/// One write inside an all-or-nothing batch
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Mark a match completed and store its final draft
    CompleteMatch { match_id: Uuid, result_draft: Draft },
    /// Record the computed score of a bet
    ScoreBet {
        bet_id: Uuid,
        score: i64,
        is_perfect_score: bool,
    },
    /// Zero a user's total and clear all event scores
    ResetUserScores { user_id: String },
    /// Same semantics as `DraftStore::decrement_scores_clamped`, except that
    /// a missing user aborts the batch
    DecrementScores {
        user_id: String,
        event_id: Uuid,
        amount: i64,
    },
    /// Replace predictions and put the bet back to pending with no score
    ResetBet { bet_id: Uuid, predictions: Draft },
    DeleteBet { bet_id: Uuid },
}

/// Rows removed by a subtree delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletedCounts {
    pub events: u64,
    pub matches: u64,
    pub bets: u64,
}

#[async_trait]
pub trait DraftStore: Send + Sync {
    // ---- events ----
    async fn insert_event(&self, event: &Event) -> StoreResult<()>;
    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>>;
    /// Newest first
    async fn list_events(&self) -> StoreResult<Vec<Event>>;
    async fn update_event_status(&self, id: Uuid, status: EventStatus) -> StoreResult<()>;

    // ---- matches ----
    async fn insert_match(&self, game: &Match) -> StoreResult<()>;
    async fn find_match(&self, id: Uuid) -> StoreResult<Option<Match>>;
    /// Newest first
    async fn list_matches(&self) -> StoreResult<Vec<Match>>;
    async fn find_matches_by_event(&self, event_id: Uuid) -> StoreResult<Vec<Match>>;
    /// Games of a series, optionally filtered by status
    async fn find_matches_by_series(
        &self,
        series_id: Uuid,
        status: Option<MatchStatus>,
    ) -> StoreResult<Vec<Match>>;
    async fn update_match_status(&self, id: Uuid, status: MatchStatus) -> StoreResult<()>;

    // ---- bets ----
    async fn insert_bet(&self, bet: &Bet) -> StoreResult<()>;
    async fn find_bet(&self, id: Uuid) -> StoreResult<Option<Bet>>;
    async fn find_bets_by_match(&self, match_id: Uuid) -> StoreResult<Vec<Bet>>;
    async fn find_bets_by_user(&self, user_id: &str) -> StoreResult<Vec<Bet>>;
    async fn find_bet_for_user_and_match(
        &self,
        user_id: &str,
        match_id: Uuid,
    ) -> StoreResult<Option<Bet>>;
    /// Replace predictions and put the bet back to pending with no score
    async fn update_bet_predictions(&self, bet_id: Uuid, predictions: &Draft) -> StoreResult<()>;

    // ---- users ----
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user(&self, id: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn update_user_socials(&self, id: &str, socials: &Socials) -> StoreResult<()>;
    /// Append badges whose id the user does not hold yet; returns the full list
    async fn append_badges(&self, id: &str, badges: &[Badge]) -> StoreResult<Vec<Badge>>;

    // ---- atomic aggregate primitives ----
    /// Add `amount` to the total and to `event_scores[event_id]`
    async fn increment_scores(&self, user_id: &str, event_id: Uuid, amount: i64) -> StoreResult<User>;
    /// Subtract `amount` from the total and, when present and non-zero, from
    /// `event_scores[event_id]`; both clamp at zero. `None` if the user is gone.
    async fn decrement_scores_clamped(
        &self,
        user_id: &str,
        event_id: Uuid,
        amount: i64,
    ) -> StoreResult<Option<User>>;
    /// Subtract the stored event score from the total (clamped) and drop the
    /// key. Returns the amount that was removed.
    async fn remove_event_score(&self, user_id: &str, event_id: Uuid) -> StoreResult<i64>;
    /// Add `delta` to the total only, clamping at zero
    async fn adjust_total_score(&self, user_id: &str, delta: i64) -> StoreResult<User>;

    // ---- batches and subtree deletes ----
    /// Apply every op or none of them
    async fn commit_batch(&self, ops: Vec<WriteOp>) -> StoreResult<()>;
    /// Delete a match and all of its bets in one transaction
    async fn delete_match_subtree(&self, match_id: Uuid) -> StoreResult<DeletedCounts>;
    /// Delete an event with all its matches and bets in one transaction
    async fn delete_event_subtree(&self, event_id: Uuid) -> StoreResult<DeletedCounts>;
}
