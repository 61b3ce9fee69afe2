#![allow(dead_code)]

use async_trait::async_trait;
use pickem_backend::auth::Caller;
use pickem_backend::config::{AppConfig, RetryConfig, StoreBackend};
use pickem_backend::error::{AppResult, StoreError, StoreResult};
use pickem_backend::models::*;
use pickem_backend::services::champions::{Champion, ChampionRoster, ChampionSource};
use pickem_backend::store::{DeletedCounts, DraftStore, MemoryDraftStore, WriteOp};
use pickem_backend::AppState;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const ADMIN_ID: &str = "admin-uid";

/// Config with fast retries so failure paths finish quickly
pub fn test_config() -> AppConfig {
    AppConfig {
        store_backend: StoreBackend::Memory,
        retry: RetryConfig {
            max_attempts: 2,
            initial_delay_ms: 1,
        },
        ..AppConfig::default()
    }
}

/// Fixed two-champion roster
pub struct StaticChampions;

#[async_trait]
impl ChampionSource for StaticChampions {
    async fn fetch_roster(&self) -> AppResult<ChampionRoster> {
        Ok(ChampionRoster {
            version: "14.1.1".to_string(),
            champions: vec![
                Champion {
                    id: "Ahri".into(),
                    key: "103".into(),
                    name: "Ahri".into(),
                },
                Champion {
                    id: "Aatrox".into(),
                    key: "266".into(),
                    name: "Aatrox".into(),
                },
            ],
        })
    }
}

pub fn build_state(store: Arc<dyn DraftStore>) -> AppState {
    AppState::new(test_config(), store, Arc::new(StaticChampions), None)
}

/// The real draft used by most scenarios
pub fn reference_draft() -> Draft {
    Draft::new(
        RoleMap::from_picks(["Aatrox", "Lee Sin", "Ahri", "Jinx", "Thresh"]),
        RoleMap::from_picks(["Gnar", "Vi", "Orianna", "Kai'Sa", "Nautilus"]),
    )
}

/// A second full draft sharing no champion with `reference_draft`
pub fn other_draft() -> Draft {
    Draft::new(
        RoleMap::from_picks(["Renekton", "Sejuani", "Azir", "Varus", "Rakan"]),
        RoleMap::from_picks(["Jax", "Maokai", "Syndra", "Xayah", "Alistar"]),
    )
}

/// `reference_draft` with the first `wrong` slots (team1 first) swapped for
/// champions that appear nowhere in it
pub fn draft_with_misses(wrong: usize) -> Draft {
    let mut draft = reference_draft();
    let replacements = other_draft();
    let slots: Vec<(TeamSide, Role)> = TeamSide::BOTH
        .into_iter()
        .flat_map(|side| Role::ALL.into_iter().map(move |role| (side, role)))
        .collect();

    for (side, role) in slots.into_iter().take(wrong) {
        if let Some(champ) = replacements.side(side).get(role) {
            draft.side_mut(side).set(role, champ);
        }
    }
    draft
}

pub fn caller(id: &str) -> Caller {
    Caller::new(id)
}

pub fn admin() -> Caller {
    Caller::new(ADMIN_ID)
}

/// Insert a user straight into the store
pub async fn seed_user(store: &dyn DraftStore, id: &str, username: &str, is_admin: bool) -> User {
    let mut user = User::new(id.to_string(), username.to_string(), format!("{}@example.com", username));
    user.is_admin = is_admin;
    store.insert_user(&user).await.expect("Failed to seed user");
    user
}

/// Admin, an active event and one open match
pub struct Fixture {
    pub store: Arc<dyn DraftStore>,
    pub state: AppState,
    pub event: Event,
    pub game: Match,
}

impl Fixture {
    pub async fn new(best_of: BestOf) -> Self {
        Self::with_store(Arc::new(MemoryDraftStore::new()), best_of).await
    }

    pub async fn with_store(store: Arc<dyn DraftStore>, best_of: BestOf) -> Self {
        let state = build_state(store.clone());
        seed_user(store.as_ref(), ADMIN_ID, "admin", true).await;

        let event = state
            .matches
            .create_event(&admin(), "LEC Spring 2024", "Regular season")
            .await
            .expect("Failed to create event");
        let game = state
            .matches
            .create_match(&admin(), event.id, "G2 Esports", "Fnatic", best_of)
            .await
            .expect("Failed to create match");

        Self {
            store,
            state,
            event,
            game,
        }
    }

    /// Register a player through the service
    pub async fn player(&self, id: &str, username: &str) -> User {
        self.state
            .users
            .register(&caller(id), username, &format!("{}@example.com", username), &Socials::default())
            .await
            .expect("Failed to register player")
    }

    pub async fn bet(&self, user_id: &str, match_id: Uuid, predictions: Draft) -> Bet {
        self.state
            .betting
            .place_bet(&caller(user_id), match_id, predictions)
            .await
            .expect("Failed to place bet")
            .bet
    }

    pub async fn lock(&self, match_id: Uuid) {
        self.state
            .matches
            .lock_match(&admin(), match_id)
            .await
            .expect("Failed to lock match");
    }

    pub async fn user(&self, id: &str) -> User {
        self.store
            .find_user(id)
            .await
            .expect("Failed to load user")
            .expect("User missing")
    }
}

/// Wraps a store and fails chosen writes on demand
pub struct FaultyStore {
    inner: MemoryDraftStore,
    fail_batches: AtomicBool,
    fail_increments_for: Mutex<HashSet<String>>,
    fail_decrements_for: Mutex<HashSet<String>>,
    fail_series_lookups: AtomicBool,
    fail_match_inserts: AtomicBool,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryDraftStore::new(),
            fail_batches: AtomicBool::new(false),
            fail_increments_for: Mutex::new(HashSet::new()),
            fail_decrements_for: Mutex::new(HashSet::new()),
            fail_series_lookups: AtomicBool::new(false),
            fail_match_inserts: AtomicBool::new(false),
        }
    }

    pub fn fail_batches(&self, fail: bool) {
        self.fail_batches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_increments_for(&self, user_id: &str) {
        self.fail_increments_for.lock().unwrap().insert(user_id.to_string());
    }

    pub fn fail_decrements_for(&self, user_id: &str) {
        self.fail_decrements_for.lock().unwrap().insert(user_id.to_string());
    }

    pub fn fail_series_lookups(&self, fail: bool) {
        self.fail_series_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn fail_match_inserts(&self, fail: bool) {
        self.fail_match_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.fail_batches(false);
        self.fail_series_lookups(false);
        self.fail_match_inserts(false);
        self.fail_increments_for.lock().unwrap().clear();
        self.fail_decrements_for.lock().unwrap().clear();
    }

    fn injected(what: &str) -> StoreError {
        StoreError::Unavailable(format!("injected failure: {}", what))
    }
}

#[async_trait]
impl DraftStore for FaultyStore {
    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        self.inner.insert_event(event).await
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        self.inner.find_event(id).await
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        self.inner.list_events().await
    }

    async fn update_event_status(&self, id: Uuid, status: EventStatus) -> StoreResult<()> {
        self.inner.update_event_status(id, status).await
    }

    async fn insert_match(&self, game: &Match) -> StoreResult<()> {
        if self.fail_match_inserts.load(Ordering::SeqCst) {
            return Err(Self::injected("insert match"));
        }
        self.inner.insert_match(game).await
    }

    async fn find_match(&self, id: Uuid) -> StoreResult<Option<Match>> {
        self.inner.find_match(id).await
    }

    async fn list_matches(&self) -> StoreResult<Vec<Match>> {
        self.inner.list_matches().await
    }

    async fn find_matches_by_event(&self, event_id: Uuid) -> StoreResult<Vec<Match>> {
        self.inner.find_matches_by_event(event_id).await
    }

    async fn find_matches_by_series(
        &self,
        series_id: Uuid,
        status: Option<MatchStatus>,
    ) -> StoreResult<Vec<Match>> {
        if self.fail_series_lookups.load(Ordering::SeqCst) {
            return Err(Self::injected("series lookup"));
        }
        self.inner.find_matches_by_series(series_id, status).await
    }

    async fn update_match_status(&self, id: Uuid, status: MatchStatus) -> StoreResult<()> {
        self.inner.update_match_status(id, status).await
    }

    async fn insert_bet(&self, bet: &Bet) -> StoreResult<()> {
        self.inner.insert_bet(bet).await
    }

    async fn find_bet(&self, id: Uuid) -> StoreResult<Option<Bet>> {
        self.inner.find_bet(id).await
    }

    async fn find_bets_by_match(&self, match_id: Uuid) -> StoreResult<Vec<Bet>> {
        self.inner.find_bets_by_match(match_id).await
    }

    async fn find_bets_by_user(&self, user_id: &str) -> StoreResult<Vec<Bet>> {
        self.inner.find_bets_by_user(user_id).await
    }

    async fn find_bet_for_user_and_match(
        &self,
        user_id: &str,
        match_id: Uuid,
    ) -> StoreResult<Option<Bet>> {
        self.inner.find_bet_for_user_and_match(user_id, match_id).await
    }

    async fn update_bet_predictions(&self, bet_id: Uuid, predictions: &Draft) -> StoreResult<()> {
        self.inner.update_bet_predictions(bet_id, predictions).await
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.inner.insert_user(user).await
    }

    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        self.inner.find_user(id).await
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.inner.find_user_by_username(username).await
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.inner.list_users().await
    }

    async fn update_user_socials(&self, id: &str, socials: &Socials) -> StoreResult<()> {
        self.inner.update_user_socials(id, socials).await
    }

    async fn append_badges(&self, id: &str, badges: &[Badge]) -> StoreResult<Vec<Badge>> {
        self.inner.append_badges(id, badges).await
    }

    async fn increment_scores(&self, user_id: &str, event_id: Uuid, amount: i64) -> StoreResult<User> {
        if self.fail_increments_for.lock().unwrap().contains(user_id) {
            return Err(Self::injected("increment"));
        }
        self.inner.increment_scores(user_id, event_id, amount).await
    }

    async fn decrement_scores_clamped(
        &self,
        user_id: &str,
        event_id: Uuid,
        amount: i64,
    ) -> StoreResult<Option<User>> {
        if self.fail_decrements_for.lock().unwrap().contains(user_id) {
            return Err(Self::injected("decrement"));
        }
        self.inner.decrement_scores_clamped(user_id, event_id, amount).await
    }

    async fn remove_event_score(&self, user_id: &str, event_id: Uuid) -> StoreResult<i64> {
        if self.fail_decrements_for.lock().unwrap().contains(user_id) {
            return Err(Self::injected("remove event score"));
        }
        self.inner.remove_event_score(user_id, event_id).await
    }

    async fn adjust_total_score(&self, user_id: &str, delta: i64) -> StoreResult<User> {
        self.inner.adjust_total_score(user_id, delta).await
    }

    async fn commit_batch(&self, ops: Vec<WriteOp>) -> StoreResult<()> {
        if self.fail_batches.load(Ordering::SeqCst) {
            return Err(StoreError::BatchAborted("injected failure: batch".to_string()));
        }
        {
            let failing = self.fail_decrements_for.lock().unwrap();
            let hit = ops.iter().any(|op| {
                matches!(op, WriteOp::DecrementScores { user_id, .. } if failing.contains(user_id))
            });
            if hit {
                return Err(Self::injected("decrement"));
            }
        }
        self.inner.commit_batch(ops).await
    }

    async fn delete_match_subtree(&self, match_id: Uuid) -> StoreResult<DeletedCounts> {
        self.inner.delete_match_subtree(match_id).await
    }

    async fn delete_event_subtree(&self, event_id: Uuid) -> StoreResult<DeletedCounts> {
        self.inner.delete_event_subtree(event_id).await
    }
}
