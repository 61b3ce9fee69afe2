use super::draft::Draft;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Bet status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    Pending,
    Scored,
}

impl BetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetStatus::Pending => "pending",
            BetStatus::Scored => "scored",
        }
    }
}

impl FromStr for BetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(BetStatus::Pending),
            "scored" => Ok(BetStatus::Scored),
            _ => Err(format!("Invalid bet status: {}", s)),
        }
    }
}

/// A user's predicted draft for both teams of one match
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub id: Uuid,
    pub user_id: String,
    pub match_id: Uuid,
    pub event_id: Uuid,
    pub predictions: Draft,
    /// Only meaningful once the match is completed
    pub score: Option<i64>,
    pub status: BetStatus,
    pub is_perfect_score: bool,
    pub created_at: NaiveDateTime,
}

impl Bet {
    /// Create a new pending Bet
    pub fn new(user_id: String, match_id: Uuid, event_id: Uuid, predictions: Draft) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            match_id,
            event_id,
            predictions,
            score: None,
            status: BetStatus::Pending,
            is_perfect_score: false,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Points granted by this bet, zero while unscored
    pub fn points(&self) -> i64 {
        self.score.unwrap_or(0)
    }

    pub fn is_scored(&self) -> bool {
        self.score.is_some()
    }
}
