use crate::auth::{self, Caller};
use crate::error::{AppError, AppResult};
use crate::models::{Bet, BetStatus, Draft};
use crate::services::badges::BadgeService;
use crate::services::series::{validate_draft, SeriesExclusionResolver};
use crate::store::{DraftStore, WriteOp};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Service for managing bets
pub struct BettingService {
    store: Arc<dyn DraftStore>,
    series: Arc<SeriesExclusionResolver>,
    badges: BadgeService,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BetResult {
    pub bet: Bet,
    /// False when an existing bet was edited
    pub created: bool,
    pub new_badges: Vec<String>,
}

impl BettingService {
    pub fn new(store: Arc<dyn DraftStore>, series: Arc<SeriesExclusionResolver>) -> Self {
        Self {
            badges: BadgeService::new(store.clone()),
            store,
            series,
        }
    }

    /// Place a bet, or replace the caller's predictions if they already bet on
    /// this match
    pub async fn place_bet(&self, caller: &Caller, match_id: Uuid, predictions: Draft) -> AppResult<BetResult> {
        let user_id = auth::require_authenticated(caller)?;
        info!("Placing bet: user={}, match={}", user_id, match_id);

        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let game = self
            .store
            .find_match(match_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Match {} not found", match_id)))?;

        if !game.is_open() {
            return Err(AppError::BusinessLogic(format!(
                "Match is {} and no longer accepts bets",
                game.status.as_str()
            )));
        }

        let excluded = self.series.excluded_for_match(&game).await;
        validate_draft(&predictions, &excluded, false)?;

        if let Some(mut existing) = self.store.find_bet_for_user_and_match(user_id, match_id).await? {
            // An edited bet is unscored again, so its old points leave the
            // totals in the same batch that clears its score
            if existing.points() > 0 {
                self.store
                    .commit_batch(vec![
                        WriteOp::ResetBet {
                            bet_id: existing.id,
                            predictions: predictions.clone(),
                        },
                        WriteOp::DecrementScores {
                            user_id: user_id.to_string(),
                            event_id: game.event_id,
                            amount: existing.points(),
                        },
                    ])
                    .await?;
            } else {
                self.store.update_bet_predictions(existing.id, &predictions).await?;
            }

            existing.predictions = predictions;
            existing.score = None;
            existing.is_perfect_score = false;
            existing.status = BetStatus::Pending;
            info!("Updated bet {}", existing.id);

            return Ok(BetResult {
                bet: existing,
                created: false,
                new_badges: Vec::new(),
            });
        }

        let bet = Bet::new(user_id.to_string(), match_id, game.event_id, predictions);
        self.store.insert_bet(&bet).await?;
        info!("Created bet {}", bet.id);

        let new_badges = match self.badges.evaluate_after_placement(user_id).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Badge check after bet {} failed: {}", bet.id, e);
                Vec::new()
            }
        };

        Ok(BetResult {
            bet,
            created: true,
            new_badges,
        })
    }

    /// All bets of a user, newest first
    pub async fn bets_for_user(&self, user_id: &str) -> AppResult<Vec<Bet>> {
        Ok(self.store.find_bets_by_user(user_id).await?)
    }

    /// The caller's bet on one match, if any
    pub async fn bet_for_match(&self, caller: &Caller, match_id: Uuid) -> AppResult<Option<Bet>> {
        let user_id = auth::require_authenticated(caller)?;
        Ok(self.store.find_bet_for_user_and_match(user_id, match_id).await?)
    }
}
