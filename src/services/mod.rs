pub mod audit;
pub mod badges;
pub mod betting_service;
pub mod champions;
pub mod leaderboard;
pub mod match_service;
pub mod profile_stats;
pub mod reversal;
pub mod score_admin;
pub mod scoring;
pub mod series;
pub mod user_service;

pub use audit::AuditTrailService;
pub use badges::BadgeService;
pub use betting_service::BettingService;
pub use champions::{ChampionCatalog, ChampionSource, DataDragonSource};
pub use leaderboard::LeaderboardService;
pub use match_service::MatchService;
pub use profile_stats::ProfileStatsService;
pub use reversal::{ReversalEngine, ReversalReport};
pub use score_admin::ScoreAdminService;
pub use scoring::{ResolutionReport, ScoringEngine, UserScoreUpdate};
pub use series::SeriesExclusionResolver;
pub use user_service::UserService;
