use crate::config::RetryConfig;
use crate::error::{AppError, AppResult};
use crate::services::scoring::AggregateFailure;
use crate::store::{DeletedCounts, DraftStore, WriteOp};
use crate::utils::retry_with_backoff;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Result of undoing a match or an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReversalReport {
    /// Points taken back per user
    pub points_removed: BTreeMap<String, i64>,
    pub deleted_events: u64,
    pub deleted_matches: u64,
    pub deleted_bets: u64,
    /// Users whose aggregates could not be corrected
    pub failures: Vec<AggregateFailure>,
}

impl ReversalReport {
    fn absorb(&mut self, deleted: DeletedCounts) {
        self.deleted_events += deleted.events;
        self.deleted_matches += deleted.matches;
        self.deleted_bets += deleted.bets;
    }

    /// True when the match or event itself was removed
    pub fn removed_target(&self) -> bool {
        self.deleted_events > 0 || self.deleted_matches > 0
    }

    /// Failed corrections as an error, surfaced to callers as a warning
    pub fn partial_failure(&self) -> Option<AppError> {
        if self.failures.is_empty() {
            return None;
        }
        Some(AppError::PartialAggregateFailure {
            failed: self.failures.len(),
            attempted: self.points_removed.len() + self.failures.len(),
        })
    }
}

/// Undoes scoring when matches or events are deleted.
///
/// User aggregates are corrected before anything is deleted. For a match,
/// each user's subtraction commits in one batch with the deletion of the
/// bets that justified it; for an event, the stored per-event score is the
/// record removed alongside the total. If any user's correction fails, the
/// match or event is kept so the remaining bets and scores still describe
/// what is owed, and a later delete picks up where this one stopped.
/// Badges stay.
pub struct ReversalEngine {
    store: Arc<dyn DraftStore>,
    retry: RetryConfig,
}

impl ReversalEngine {
    pub fn new(store: Arc<dyn DraftStore>, retry: RetryConfig) -> Self {
        Self { store, retry }
    }

    /// Subtract the bets' scores from their users, clamped at zero, then
    /// delete the match with its remaining bets
    pub async fn reverse_match(&self, match_id: Uuid) -> AppResult<ReversalReport> {
        info!("Reversing match {}", match_id);
        let store = &self.store;

        let game = retry_with_backoff(&self.retry, "load match", move || async move {
            Ok(store.find_match(match_id).await?)
        })
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Match {} not found", match_id)))?;

        let bets = retry_with_backoff(&self.retry, "load bets", move || async move {
            Ok(store.find_bets_by_match(match_id).await?)
        })
        .await?;

        let mut scored: BTreeMap<String, (i64, Vec<Uuid>)> = BTreeMap::new();
        for bet in bets.iter().filter(|b| b.points() > 0) {
            let entry = scored.entry(bet.user_id.clone()).or_default();
            entry.0 += bet.points();
            entry.1.push(bet.id);
        }

        let event_id = game.event_id;
        let mut report = ReversalReport::default();
        for (user_id, (amount, bet_ids)) in scored {
            match self.correct_and_drop_bets(&user_id, event_id, amount, &bet_ids).await {
                Ok(true) => {
                    info!("User {} loses {} points", user_id, amount);
                    report.points_removed.insert(user_id, amount);
                    report.deleted_bets += bet_ids.len() as u64;
                }
                Ok(false) => {
                    info!("User {} no longer exists, dropping their bets only", user_id);
                    report.deleted_bets += bet_ids.len() as u64;
                }
                Err(e) => {
                    error!("Failed to subtract {} points from user {}: {}", amount, user_id, e);
                    report.failures.push(AggregateFailure {
                        user_id,
                        step: "aggregate",
                        message: format!("{} points not subtracted: {}", amount, e),
                    });
                }
            }
        }

        if !report.failures.is_empty() {
            warn!(
                "Match {} kept: {} user corrections failed",
                match_id,
                report.failures.len()
            );
            return Ok(report);
        }

        let deleted = store
            .delete_match_subtree(match_id)
            .await
            .map_err(|e| AppError::BatchWriteFailure(e.to_string()))?;
        info!("Match {} deleted with {} unscored bets", match_id, deleted.bets);

        report.absorb(deleted);
        Ok(report)
    }

    /// Subtract `amount` and delete `bet_ids` in one batch. Returns false when
    /// the user is gone and only the bets were deleted.
    async fn correct_and_drop_bets(
        &self,
        user_id: &str,
        event_id: Uuid,
        amount: i64,
        bet_ids: &[Uuid],
    ) -> AppResult<bool> {
        let store = &self.store;

        let exists = retry_with_backoff(&self.retry, "load user", move || async move {
            Ok(store.find_user(user_id).await?)
        })
        .await?
        .is_some();

        let mut ops = Vec::with_capacity(bet_ids.len() + 1);
        if exists {
            ops.push(WriteOp::DecrementScores {
                user_id: user_id.to_string(),
                event_id,
                amount,
            });
        }
        ops.extend(bet_ids.iter().map(|&bet_id| WriteOp::DeleteBet { bet_id }));

        let ops = &ops;
        retry_with_backoff(&self.retry, "decrement scores", move || async move {
            Ok(store.commit_batch(ops.clone()).await?)
        })
        .await?;
        Ok(exists)
    }

    /// Drop each user's stored score for the event from their totals, then
    /// delete the event with all of its matches and bets.
    ///
    /// Uses the stored per-event aggregate as-is rather than recomputing it
    /// from bets. Removal clears the entry, so a retried delete only touches
    /// users whose correction failed before.
    pub async fn reverse_event(&self, event_id: Uuid) -> AppResult<ReversalReport> {
        info!("Reversing event {}", event_id);
        let store = &self.store;

        if store.find_event(event_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Event {} not found", event_id)));
        }

        let users = retry_with_backoff(&self.retry, "load users", move || async move {
            Ok(store.list_users().await?)
        })
        .await?;

        let mut report = ReversalReport::default();
        for user in users.iter().filter(|u| u.event_score(event_id) != 0) {
            let uid = user.id.as_str();
            let result = retry_with_backoff(&self.retry, "remove event score", move || async move {
                Ok(store.remove_event_score(uid, event_id).await?)
            })
            .await;

            match result {
                Ok(removed) => {
                    report.points_removed.insert(user.id.clone(), removed);
                }
                Err(e) => {
                    error!("Failed to remove event {} score from user {}: {}", event_id, user.id, e);
                    report.failures.push(AggregateFailure {
                        user_id: user.id.clone(),
                        step: "aggregate",
                        message: e.to_string(),
                    });
                }
            }
        }

        if !report.failures.is_empty() {
            warn!(
                "Event {} kept: {} user corrections failed",
                event_id,
                report.failures.len()
            );
            return Ok(report);
        }

        let deleted = store
            .delete_event_subtree(event_id)
            .await
            .map_err(|e| AppError::BatchWriteFailure(e.to_string()))?;
        info!(
            "Event {} deleted with {} matches and {} bets",
            event_id, deleted.matches, deleted.bets
        );

        report.absorb(deleted);
        Ok(report)
    }
}
