//! Badge rules.
//!
//! Badges only accumulate: evaluation returns the kinds a user qualifies for
//! right now, and persistence appends the ones not held yet.

use crate::error::AppResult;
use crate::models::{BadgeKind, Bet};
use crate::services::leaderboard::global_rank;
use crate::store::DraftStore;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

pub const DEDICATED_BETTOR_BETS: usize = 10;
pub const VETERAN_BETS: usize = 50;
pub const TOP_SCORER_POINTS: i64 = 1000;
pub const TOP_RANK: usize = 10;

/// What the badge rules need to know about a user's bets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BetHistory {
    /// Bets counted by distinct match
    pub distinct_matches: usize,
    pub has_perfect_score: bool,
}

impl BetHistory {
    pub fn from_bets(bets: &[Bet]) -> Self {
        let matches: HashSet<_> = bets.iter().map(|b| b.match_id).collect();
        Self {
            distinct_matches: matches.len(),
            has_perfect_score: bets.iter().any(|b| b.is_perfect_score),
        }
    }
}

/// Badges earned just by placing bets
pub fn placement_badges(history: &BetHistory) -> Vec<BadgeKind> {
    let mut kinds = Vec::new();
    if history.distinct_matches >= 1 {
        kinds.push(BadgeKind::FirstBet);
    }
    if history.distinct_matches >= DEDICATED_BETTOR_BETS {
        kinds.push(BadgeKind::DedicatedBettor);
    }
    if history.distinct_matches >= VETERAN_BETS {
        kinds.push(BadgeKind::Veteran);
    }
    kinds
}

/// Every badge the user qualifies for after a scoring update
pub fn earned_badges(history: &BetHistory, total_score: i64, rank: Option<usize>) -> Vec<BadgeKind> {
    let mut kinds = placement_badges(history);
    if history.has_perfect_score {
        kinds.push(BadgeKind::PerfectScore);
    }
    if total_score >= TOP_SCORER_POINTS {
        kinds.push(BadgeKind::TopScorer);
    }
    if matches!(rank, Some(r) if r >= 1 && r <= TOP_RANK) {
        kinds.push(BadgeKind::Top10);
    }
    kinds
}

/// Evaluates and persists badges for a single user
pub struct BadgeService {
    store: Arc<dyn DraftStore>,
}

impl BadgeService {
    pub fn new(store: Arc<dyn DraftStore>) -> Self {
        Self { store }
    }

    /// Award whatever the user now qualifies for after their scores moved.
    /// Ranks every user by total score to decide `top_10`.
    ///
    /// Returns the ids of badges that were newly unlocked.
    pub async fn evaluate_after_scoring(&self, user_id: &str, total_score: i64) -> AppResult<Vec<String>> {
        let bets = self.store.find_bets_by_user(user_id).await?;
        let history = BetHistory::from_bets(&bets);

        let users = self.store.list_users().await?;
        let rank = global_rank(&users, user_id);

        self.award(user_id, earned_badges(&history, total_score, rank)).await
    }

    /// Award bet-count badges after a bet was placed
    pub async fn evaluate_after_placement(&self, user_id: &str) -> AppResult<Vec<String>> {
        let bets = self.store.find_bets_by_user(user_id).await?;
        let history = BetHistory::from_bets(&bets);

        self.award(user_id, placement_badges(&history)).await
    }

    async fn award(&self, user_id: &str, kinds: Vec<BadgeKind>) -> AppResult<Vec<String>> {
        let user = match self.store.find_user(user_id).await? {
            Some(user) => user,
            None => return Ok(Vec::new()),
        };

        let unlocked: Vec<_> = kinds
            .into_iter()
            .filter(|kind| !user.has_badge(kind.id()))
            .map(|kind| kind.unlock())
            .collect();
        if unlocked.is_empty() {
            return Ok(Vec::new());
        }

        self.store.append_badges(user_id, &unlocked).await?;

        let ids: Vec<String> = unlocked.into_iter().map(|b| b.id).collect();
        info!("User {} unlocked badges: {}", user_id, ids.join(", "));
        Ok(ids)
    }
}
