//! Match resolution.
//!
//! Resolving a match scores every bet against the final draft, commits the
//! match completion and all bet scores as one all-or-nothing batch, then
//! updates each affected user's aggregates and badges best-effort, and
//! finally opens the next game of the series.

use crate::config::RetryConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Draft, Match, Role, TeamSide};
use crate::services::badges::BadgeService;
use crate::store::{DraftStore, WriteOp};
use crate::utils::retry_with_backoff;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Points for getting all ten slots right
pub const PERFECT_SCORE: i64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetScore {
    pub score: i64,
    pub is_perfect_score: bool,
}

/// One point per slot where the predicted champion equals the result.
/// Blank slots never match, not even against a blank result.
pub fn score_bet(predictions: &Draft, result: &Draft) -> BetScore {
    let mut correct = 0;
    for side in TeamSide::BOTH {
        for role in Role::ALL {
            let predicted = predictions.side(side).get(role);
            if predicted.is_some() && predicted == result.side(side).get(role) {
                correct += 1;
            }
        }
    }

    if correct == 10 {
        BetScore {
            score: PERFECT_SCORE,
            is_perfect_score: true,
        }
    } else {
        BetScore {
            score: correct,
            is_perfect_score: false,
        }
    }
}

/// Aggregate change applied to one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserScoreUpdate {
    pub user_id: String,
    pub points_added: i64,
    pub total_score: i64,
    pub event_score: i64,
    pub new_badges: Vec<String>,
}

/// A follow-up write that failed after the batch committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateFailure {
    pub user_id: String,
    pub step: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionReport {
    pub match_id: Uuid,
    pub event_id: Uuid,
    pub bets_scored: usize,
    pub user_updates: Vec<UserScoreUpdate>,
    pub failures: Vec<AggregateFailure>,
    pub next_game: Option<Match>,
    pub next_game_error: Option<String>,
}

impl ResolutionReport {
    /// Whether every step after the batch went through
    pub fn is_fully_applied(&self) -> bool {
        self.failures.is_empty() && self.next_game_error.is_none()
    }

    /// Follow-up failures as an error, for callers that surface them as a
    /// warning. Opening the next game counts as one follow-up write.
    pub fn partial_failure(&self) -> Option<AppError> {
        if self.is_fully_applied() {
            return None;
        }
        let next_game_failed = usize::from(self.next_game_error.is_some());
        let next_game_attempted = usize::from(self.next_game.is_some()) + next_game_failed;
        Some(AppError::PartialAggregateFailure {
            failed: self.failures.len() + next_game_failed,
            attempted: self.user_updates.len() + self.failures.len() + next_game_attempted,
        })
    }
}

pub struct ScoringEngine {
    store: Arc<dyn DraftStore>,
    badges: BadgeService,
    retry: RetryConfig,
}

impl ScoringEngine {
    pub fn new(store: Arc<dyn DraftStore>, retry: RetryConfig) -> Self {
        Self {
            badges: BadgeService::new(store.clone()),
            store,
            retry,
        }
    }

    /// Score all bets of `game` against `result_draft`.
    ///
    /// Fails with `BatchWriteFailure` and no state change when the match and
    /// bet writes cannot be committed together. Anything that fails after
    /// that is recorded in the report instead of being returned.
    pub async fn resolve_match(&self, game: &Match, result_draft: &Draft) -> AppResult<ResolutionReport> {
        info!("Resolving match {} ({} vs {}, game {})", game.id, game.team1, game.team2, game.game_number);

        if !result_draft.is_complete() {
            return Err(AppError::InvalidArgument(
                "Result draft must name a champion for every role of both teams".to_string(),
            ));
        }

        let match_id = game.id;
        let store = &self.store;
        let bets = retry_with_backoff(&self.retry, "load bets", move || async move {
            Ok(store.find_bets_by_match(match_id).await?)
        })
        .await?;

        // Score deltas per user; a re-resolved bet only contributes its change
        let mut deltas: BTreeMap<String, i64> = BTreeMap::new();
        let mut ops = Vec::with_capacity(bets.len() + 1);
        ops.push(WriteOp::CompleteMatch {
            match_id,
            result_draft: result_draft.clone(),
        });

        for bet in &bets {
            let scored = score_bet(&bet.predictions, result_draft);
            ops.push(WriteOp::ScoreBet {
                bet_id: bet.id,
                score: scored.score,
                is_perfect_score: scored.is_perfect_score,
            });
            *deltas.entry(bet.user_id.clone()).or_insert(0) += scored.score - bet.points();
        }

        let batch = ops;
        retry_with_backoff(&self.retry, "commit resolution", || {
            let ops = batch.clone();
            async move { Ok(store.commit_batch(ops).await?) }
        })
        .await
        .map_err(|e| match e {
            AppError::BatchWriteFailure(msg) => AppError::BatchWriteFailure(msg),
            other => AppError::BatchWriteFailure(other.to_string()),
        })?;

        info!("Match {} completed, {} bets scored", match_id, bets.len());

        let mut report = ResolutionReport {
            match_id,
            event_id: game.event_id,
            bets_scored: bets.len(),
            user_updates: Vec::new(),
            failures: Vec::new(),
            next_game: None,
            next_game_error: None,
        };

        for (user_id, delta) in deltas {
            if delta == 0 {
                continue;
            }
            match self.apply_delta(&user_id, game.event_id, delta).await {
                Ok(update) => report.user_updates.push(update),
                Err(failure) => {
                    error!(
                        "Aggregate update for user {} failed at {}: {}",
                        failure.user_id, failure.step, failure.message
                    );
                    report.failures.push(failure);
                }
            }
        }

        self.continue_series(game, &mut report).await;

        if !report.failures.is_empty() {
            warn!(
                "Match {} resolved with {} failed user updates",
                match_id,
                report.failures.len()
            );
        }
        Ok(report)
    }

    /// Move one user's aggregates by `delta` and re-check badges
    async fn apply_delta(
        &self,
        user_id: &str,
        event_id: Uuid,
        delta: i64,
    ) -> Result<UserScoreUpdate, AggregateFailure> {
        let failure = |step: &'static str, e: AppError| AggregateFailure {
            user_id: user_id.to_string(),
            step,
            message: e.to_string(),
        };
        let store = &self.store;

        let user = if delta > 0 {
            retry_with_backoff(&self.retry, "increment scores", move || async move {
                Ok(store.increment_scores(user_id, event_id, delta).await?)
            })
            .await
            .map_err(|e| failure("aggregate", e))?
        } else {
            retry_with_backoff(&self.retry, "decrement scores", move || async move {
                store
                    .decrement_scores_clamped(user_id, event_id, -delta)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))
            })
            .await
            .map_err(|e| failure("aggregate", e))?
        };

        let new_badges = self
            .badges
            .evaluate_after_scoring(user_id, user.total_score)
            .await
            .map_err(|e| failure("badges", e))?;

        Ok(UserScoreUpdate {
            user_id: user_id.to_string(),
            points_added: delta,
            total_score: user.total_score,
            event_score: user.event_score(event_id),
            new_badges,
        })
    }

    /// Open the next game of the series unless it is over or already exists
    async fn continue_series(&self, game: &Match, report: &mut ResolutionReport) {
        let Some(next) = game.next_game() else {
            return;
        };
        let Some(series_id) = game.series_id else {
            return;
        };

        let existing = match self.store.find_matches_by_series(series_id, None).await {
            Ok(games) => games.into_iter().find(|g| g.game_number == next.game_number),
            Err(e) => {
                report.next_game_error = Some(e.to_string());
                error!("Failed to check series {} for game {}: {}", series_id, next.game_number, e);
                return;
            }
        };
        if let Some(existing) = existing {
            info!("Game {} of series {} already exists", existing.game_number, series_id);
            return;
        }

        match self.store.insert_match(&next).await {
            Ok(()) => {
                info!("Created game {} of series {}", next.game_number, series_id);
                report.next_game = Some(next);
            }
            Err(e) => {
                error!("Failed to create game {} of series {}: {}", next.game_number, series_id, e);
                report.next_game_error = Some(e.to_string());
            }
        }
    }
}
