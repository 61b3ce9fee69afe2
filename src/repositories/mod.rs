pub mod bet_repository;
pub mod event_repository;
pub mod match_repository;
pub mod user_repository;

// Re-export all repositories for convenient access
pub use bet_repository::BetRepository;
pub use event_repository::EventRepository;
pub use match_repository::MatchRepository;
pub use user_repository::UserRepository;
