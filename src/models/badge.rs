use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Badges a user can unlock. Ids are stable and stored on the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BadgeKind {
    FirstBet,
    PerfectScore,
    DedicatedBettor,
    Veteran,
    TopScorer,
    Top10,
}

impl BadgeKind {
    pub const ALL: [BadgeKind; 6] = [
        BadgeKind::FirstBet,
        BadgeKind::PerfectScore,
        BadgeKind::DedicatedBettor,
        BadgeKind::Veteran,
        BadgeKind::TopScorer,
        BadgeKind::Top10,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            BadgeKind::FirstBet => "first_bet",
            BadgeKind::PerfectScore => "perfect_score",
            BadgeKind::DedicatedBettor => "dedicated_bettor",
            BadgeKind::Veteran => "veteran",
            BadgeKind::TopScorer => "top_scorer",
            BadgeKind::Top10 => "top_10",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BadgeKind::FirstBet => "First Bet",
            BadgeKind::PerfectScore => "Perfect Score",
            BadgeKind::DedicatedBettor => "Dedicated Bettor",
            BadgeKind::Veteran => "Veteran",
            BadgeKind::TopScorer => "Top Scorer",
            BadgeKind::Top10 => "Top 10",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            BadgeKind::FirstBet => "🎯",
            BadgeKind::PerfectScore => "⭐",
            BadgeKind::DedicatedBettor => "🔥",
            BadgeKind::Veteran => "🏅",
            BadgeKind::TopScorer => "💎",
            BadgeKind::Top10 => "🏆",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            BadgeKind::FirstBet => "Placed your first bet",
            BadgeKind::PerfectScore => "Achieved a perfect 10/10 score",
            BadgeKind::DedicatedBettor => "Placed 10 bets",
            BadgeKind::Veteran => "Placed 50 bets",
            BadgeKind::TopScorer => "Reached 1000+ total points",
            BadgeKind::Top10 => "Ranked in the top 10 globally",
        }
    }

    /// Materialize the badge as unlocked now
    pub fn unlock(&self) -> Badge {
        Badge {
            id: self.id().to_string(),
            name: self.name().to_string(),
            icon: self.icon().to_string(),
            description: self.description().to_string(),
            unlocked_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// A badge as stored on the user document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub unlocked_at: NaiveDateTime,
}
