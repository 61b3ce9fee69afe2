//! Domain models for the Pickem backend.
//!
//! Events own matches, matches own bets, and users own their bets and their
//! cached score aggregates. Relationships are kept through id fields only.

pub mod badge;
pub mod bet;
pub mod draft;
pub mod event;
pub mod game;
pub mod user;

// Re-export all models for convenient access
pub use badge::{Badge, BadgeKind};
pub use bet::{Bet, BetStatus};
pub use draft::{Draft, Role, RoleMap, TeamSide};
pub use event::{Event, EventStatus};
pub use game::{BestOf, Match, MatchStatus};
pub use user::{Socials, User};
