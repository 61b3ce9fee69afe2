use super::badge::Badge;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Optional social handles shown on the profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Socials {
    #[serde(default)]
    pub twitter: String,
    #[serde(default)]
    pub instagram: String,
    #[serde(default)]
    pub discord: String,
}

/// User document keyed by the identity provider's uid.
///
/// `total_score` and `event_scores` are cached aggregates of the user's bet
/// scores, maintained by scoring and reversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub total_score: i64,
    pub event_scores: HashMap<Uuid, i64>,
    pub is_admin: bool,
    pub badges: Vec<Badge>,
    pub socials: Socials,
    pub created_at: NaiveDateTime,
}

impl User {
    /// Create a new User with zeroed aggregates
    pub fn new(id: String, username: String, email: String) -> Self {
        Self {
            id,
            username,
            email,
            total_score: 0,
            event_scores: HashMap::new(),
            is_admin: false,
            badges: Vec::new(),
            socials: Socials::default(),
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    pub fn event_score(&self, event_id: Uuid) -> i64 {
        self.event_scores.get(&event_id).copied().unwrap_or(0)
    }

    pub fn has_badge(&self, badge_id: &str) -> bool {
        self.badges.iter().any(|b| b.id == badge_id)
    }
}
