use super::{DeletedCounts, DraftStore, WriteOp};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    Badge, Bet, BetStatus, Draft, Event, EventStatus, Match, MatchStatus, Socials, User,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Collections {
    events: Vec<Event>,
    matches: Vec<Match>,
    bets: Vec<Bet>,
    users: HashMap<String, User>,
}

impl Collections {
    fn event_mut(&mut self, id: Uuid) -> StoreResult<&mut Event> {
        self.events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("Event {}", id)))
    }

    fn match_mut(&mut self, id: Uuid) -> StoreResult<&mut Match> {
        self.matches
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("Match {}", id)))
    }

    fn bet_mut(&mut self, id: Uuid) -> StoreResult<&mut Bet> {
        self.bets
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("Bet {}", id)))
    }

    fn user_mut(&mut self, id: &str) -> StoreResult<&mut User> {
        self.users
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("User {}", id)))
    }

    /// Resolve every target of a batch before anything is written
    fn check_batch(&self, ops: &[WriteOp]) -> StoreResult<()> {
        for op in ops {
            let missing = match op {
                WriteOp::CompleteMatch { match_id, .. } => {
                    (!self.matches.iter().any(|m| m.id == *match_id))
                        .then(|| format!("match {}", match_id))
                }
                WriteOp::ScoreBet { bet_id, .. }
                | WriteOp::ResetBet { bet_id, .. }
                | WriteOp::DeleteBet { bet_id } => {
                    (!self.bets.iter().any(|b| b.id == *bet_id)).then(|| format!("bet {}", bet_id))
                }
                WriteOp::ResetUserScores { user_id } | WriteOp::DecrementScores { user_id, .. } => {
                    (!self.users.contains_key(user_id)).then(|| format!("user {}", user_id))
                }
            };
            if let Some(target) = missing {
                return Err(StoreError::BatchAborted(format!("{} does not exist", target)));
            }
        }
        Ok(())
    }

    fn apply(&mut self, op: WriteOp) -> StoreResult<()> {
        match op {
            WriteOp::CompleteMatch { match_id, result_draft } => {
                let game = self.match_mut(match_id)?;
                game.status = MatchStatus::Completed;
                game.result_draft = Some(result_draft);
            }
            WriteOp::ScoreBet { bet_id, score, is_perfect_score } => {
                let bet = self.bet_mut(bet_id)?;
                bet.score = Some(score);
                bet.is_perfect_score = is_perfect_score;
                bet.status = BetStatus::Scored;
            }
            WriteOp::ResetUserScores { user_id } => {
                let user = self.user_mut(&user_id)?;
                user.total_score = 0;
                user.event_scores.clear();
            }
            WriteOp::DecrementScores { user_id, event_id, amount } => {
                subtract_clamped(self.user_mut(&user_id)?, event_id, amount);
            }
            WriteOp::ResetBet { bet_id, predictions } => {
                let bet = self.bet_mut(bet_id)?;
                bet.predictions = predictions;
                bet.score = None;
                bet.is_perfect_score = false;
                bet.status = BetStatus::Pending;
            }
            WriteOp::DeleteBet { bet_id } => {
                self.bets.retain(|b| b.id != bet_id);
            }
        }
        Ok(())
    }
}

/// Take `amount` off the total and off a non-zero score for `event_id`,
/// never below zero
fn subtract_clamped(user: &mut User, event_id: Uuid, amount: i64) {
    user.total_score = (user.total_score - amount).max(0);
    if let Some(score) = user.event_scores.get_mut(&event_id) {
        if *score != 0 {
            *score = (*score - amount).max(0);
        }
    }
}

/// In-process store with the same atomicity guarantees as the PostgreSQL
/// store: every operation runs under a single write lock.
#[derive(Default)]
pub struct MemoryDraftStore {
    inner: RwLock<Collections>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T: Clone>(items: impl DoubleEndedIterator<Item = T>) -> Vec<T> {
    items.rev().collect()
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.events.iter().any(|e| e.id == event.id) {
            return Err(StoreError::Duplicate(format!("Event {}", event.id)));
        }
        inner.events.push(event.clone());
        Ok(())
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let inner = self.inner.read().await;
        Ok(inner.events.iter().find(|e| e.id == id).cloned())
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let inner = self.inner.read().await;
        Ok(newest_first(inner.events.iter().cloned()))
    }

    async fn update_event_status(&self, id: Uuid, status: EventStatus) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.event_mut(id)?.status = status;
        Ok(())
    }

    async fn insert_match(&self, game: &Match) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.matches.iter().any(|m| m.id == game.id) {
            return Err(StoreError::Duplicate(format!("Match {}", game.id)));
        }
        if let Some(series_id) = game.series_id {
            let taken = inner
                .matches
                .iter()
                .any(|m| m.series_id == Some(series_id) && m.game_number == game.game_number);
            if taken {
                return Err(StoreError::Duplicate(format!(
                    "Game {} of series {}",
                    game.game_number, series_id
                )));
            }
        }
        inner.matches.push(game.clone());
        Ok(())
    }

    async fn find_match(&self, id: Uuid) -> StoreResult<Option<Match>> {
        let inner = self.inner.read().await;
        Ok(inner.matches.iter().find(|m| m.id == id).cloned())
    }

    async fn list_matches(&self) -> StoreResult<Vec<Match>> {
        let inner = self.inner.read().await;
        Ok(newest_first(inner.matches.iter().cloned()))
    }

    async fn find_matches_by_event(&self, event_id: Uuid) -> StoreResult<Vec<Match>> {
        let inner = self.inner.read().await;
        Ok(newest_first(
            inner.matches.iter().filter(|m| m.event_id == event_id).cloned(),
        ))
    }

    async fn find_matches_by_series(
        &self,
        series_id: Uuid,
        status: Option<MatchStatus>,
    ) -> StoreResult<Vec<Match>> {
        let inner = self.inner.read().await;
        let mut games: Vec<Match> = inner
            .matches
            .iter()
            .filter(|m| m.series_id == Some(series_id))
            .filter(|m| status.map_or(true, |s| m.status == s))
            .cloned()
            .collect();
        games.sort_by_key(|m| m.game_number);
        Ok(games)
    }

    async fn update_match_status(&self, id: Uuid, status: MatchStatus) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.match_mut(id)?.status = status;
        Ok(())
    }

    async fn insert_bet(&self, bet: &Bet) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.bets.iter().any(|b| b.id == bet.id) {
            return Err(StoreError::Duplicate(format!("Bet {}", bet.id)));
        }
        inner.bets.push(bet.clone());
        Ok(())
    }

    async fn find_bet(&self, id: Uuid) -> StoreResult<Option<Bet>> {
        let inner = self.inner.read().await;
        Ok(inner.bets.iter().find(|b| b.id == id).cloned())
    }

    async fn find_bets_by_match(&self, match_id: Uuid) -> StoreResult<Vec<Bet>> {
        let inner = self.inner.read().await;
        Ok(inner.bets.iter().filter(|b| b.match_id == match_id).cloned().collect())
    }

    async fn find_bets_by_user(&self, user_id: &str) -> StoreResult<Vec<Bet>> {
        let inner = self.inner.read().await;
        Ok(newest_first(
            inner.bets.iter().filter(|b| b.user_id == user_id).cloned(),
        ))
    }

    async fn find_bet_for_user_and_match(
        &self,
        user_id: &str,
        match_id: Uuid,
    ) -> StoreResult<Option<Bet>> {
        let inner = self.inner.read().await;
        Ok(inner
            .bets
            .iter()
            .find(|b| b.user_id == user_id && b.match_id == match_id)
            .cloned())
    }

    async fn update_bet_predictions(&self, bet_id: Uuid, predictions: &Draft) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let bet = inner.bet_mut(bet_id)?;
        bet.predictions = predictions.clone();
        bet.score = None;
        bet.is_perfect_score = false;
        bet.status = BetStatus::Pending;
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.users.contains_key(&user.id) {
            return Err(StoreError::Duplicate(format!("User {}", user.id)));
        }
        if inner.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate(format!("Username {}", user.username)));
        }
        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }

    async fn update_user_socials(&self, id: &str, socials: &Socials) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.user_mut(id)?.socials = socials.clone();
        Ok(())
    }

    async fn append_badges(&self, id: &str, badges: &[Badge]) -> StoreResult<Vec<Badge>> {
        let mut inner = self.inner.write().await;
        let user = inner.user_mut(id)?;
        for badge in badges {
            if !user.has_badge(&badge.id) {
                user.badges.push(badge.clone());
            }
        }
        Ok(user.badges.clone())
    }

    async fn increment_scores(&self, user_id: &str, event_id: Uuid, amount: i64) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        let user = inner.user_mut(user_id)?;
        user.total_score += amount;
        *user.event_scores.entry(event_id).or_insert(0) += amount;
        Ok(user.clone())
    }

    async fn decrement_scores_clamped(
        &self,
        user_id: &str,
        event_id: Uuid,
        amount: i64,
    ) -> StoreResult<Option<User>> {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.get_mut(user_id) else {
            return Ok(None);
        };
        subtract_clamped(user, event_id, amount);
        Ok(Some(user.clone()))
    }

    async fn remove_event_score(&self, user_id: &str, event_id: Uuid) -> StoreResult<i64> {
        let mut inner = self.inner.write().await;
        let user = inner.user_mut(user_id)?;
        let removed = user.event_scores.remove(&event_id).unwrap_or(0);
        user.total_score = (user.total_score - removed).max(0);
        Ok(removed)
    }

    async fn adjust_total_score(&self, user_id: &str, delta: i64) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        let user = inner.user_mut(user_id)?;
        user.total_score = (user.total_score + delta).max(0);
        Ok(user.clone())
    }

    async fn commit_batch(&self, ops: Vec<WriteOp>) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.check_batch(&ops)?;
        for op in ops {
            inner.apply(op)?;
        }
        Ok(())
    }

    async fn delete_match_subtree(&self, match_id: Uuid) -> StoreResult<DeletedCounts> {
        let mut inner = self.inner.write().await;
        let bets_before = inner.bets.len();
        inner.bets.retain(|b| b.match_id != match_id);
        let matches_before = inner.matches.len();
        inner.matches.retain(|m| m.id != match_id);

        Ok(DeletedCounts {
            events: 0,
            matches: (matches_before - inner.matches.len()) as u64,
            bets: (bets_before - inner.bets.len()) as u64,
        })
    }

    async fn delete_event_subtree(&self, event_id: Uuid) -> StoreResult<DeletedCounts> {
        let mut inner = self.inner.write().await;
        let match_ids: Vec<Uuid> = inner
            .matches
            .iter()
            .filter(|m| m.event_id == event_id)
            .map(|m| m.id)
            .collect();

        let bets_before = inner.bets.len();
        inner
            .bets
            .retain(|b| b.event_id != event_id && !match_ids.contains(&b.match_id));
        let matches_before = inner.matches.len();
        inner.matches.retain(|m| m.event_id != event_id);
        let events_before = inner.events.len();
        inner.events.retain(|e| e.id != event_id);

        Ok(DeletedCounts {
            events: (events_before - inner.events.len()) as u64,
            matches: (matches_before - inner.matches.len()) as u64,
            bets: (bets_before - inner.bets.len()) as u64,
        })
    }
}
