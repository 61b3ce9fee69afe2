//! Pickem Backend Library
//!
//! Core library for the Pickem draft prediction platform: users predict the
//! champion picked in every role of a professional League of Legends match
//! and score points once the real draft is entered.

pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod repositories;
pub mod services;
pub mod store;
pub mod utils;
pub mod websocket;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult, StoreError};
pub use store::DraftStore;

use services::{
    AuditTrailService, BettingService, ChampionCatalog, ChampionSource, LeaderboardService, MatchService,
    ProfileStatsService, ReversalEngine, ScoreAdminService, ScoringEngine, SeriesExclusionResolver, UserService,
};
use std::sync::Arc;

/// Application state shared across all connections
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn DraftStore>,
    pub users: Arc<UserService>,
    pub profiles: Arc<ProfileStatsService>,
    pub matches: Arc<MatchService>,
    pub betting: Arc<BettingService>,
    pub leaderboard: Arc<LeaderboardService>,
    pub score_admin: Arc<ScoreAdminService>,
    pub champions: Arc<ChampionCatalog>,
}

impl AppState {
    /// Wire every service onto one store. Audit logging is optional.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn DraftStore>,
        champion_source: Arc<dyn ChampionSource>,
        audit: Option<Arc<AuditTrailService>>,
    ) -> Self {
        let retry = config.retry.clone();

        let series = Arc::new(SeriesExclusionResolver::new(store.clone(), retry.clone()));
        let scoring = Arc::new(ScoringEngine::new(store.clone(), retry.clone()));
        let reversal = Arc::new(ReversalEngine::new(store.clone(), retry));

        let mut matches = MatchService::new(store.clone(), scoring, reversal, series.clone());
        let mut score_admin = ScoreAdminService::new(store.clone());
        if let Some(audit) = audit {
            matches = matches.with_audit(audit.clone());
            score_admin = score_admin.with_audit(audit);
        }

        Self {
            users: Arc::new(UserService::new(store.clone())),
            profiles: Arc::new(ProfileStatsService::new(store.clone())),
            matches: Arc::new(matches),
            betting: Arc::new(BettingService::new(store.clone(), series)),
            leaderboard: Arc::new(LeaderboardService::new(store.clone())),
            score_admin: Arc::new(score_admin),
            champions: Arc::new(ChampionCatalog::new(champion_source, config.champions.clone())),
            store,
            config,
        }
    }
}
