use super::draft::Draft;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Series length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BestOf {
    Bo1,
    Bo3,
    Bo5,
}

impl BestOf {
    /// Number of games the series can run to
    pub fn max_games(&self) -> u32 {
        match self {
            BestOf::Bo1 => 1,
            BestOf::Bo3 => 3,
            BestOf::Bo5 => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BestOf::Bo1 => "bo1",
            BestOf::Bo3 => "bo3",
            BestOf::Bo5 => "bo5",
        }
    }
}

impl FromStr for BestOf {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bo1" => Ok(BestOf::Bo1),
            "bo3" => Ok(BestOf::Bo3),
            "bo5" => Ok(BestOf::Bo5),
            _ => Err(format!("Invalid best-of: {}", s)),
        }
    }
}

/// Match lifecycle: open -> locked -> completed, reopenable to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Open,
    Locked,
    Completed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Open => "open",
            MatchStatus::Locked => "locked",
            MatchStatus::Completed => "completed",
        }
    }

    /// Transitions an admin may request directly. Completion only happens
    /// through resolution, so `Locked -> Completed` is not listed here.
    pub fn can_transition_to(&self, next: MatchStatus) -> bool {
        matches!(
            (self, next),
            (MatchStatus::Open, MatchStatus::Locked)
                | (MatchStatus::Locked, MatchStatus::Open)
                | (MatchStatus::Completed, MatchStatus::Open)
        )
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(MatchStatus::Open),
            "locked" => Ok(MatchStatus::Locked),
            "completed" => Ok(MatchStatus::Completed),
            _ => Err(format!("Invalid match status: {}", s)),
        }
    }
}

/// One game between two teams; games of a best-of series share `series_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: Uuid,
    pub event_id: Uuid,
    pub team1: String,
    pub team2: String,
    pub best_of: BestOf,
    /// 1-based
    pub game_number: u32,
    pub series_id: Option<Uuid>,
    pub status: MatchStatus,
    pub result_draft: Option<Draft>,
    pub created_at: NaiveDateTime,
}

impl Match {
    /// First game of a new series
    pub fn new_series(event_id: Uuid, team1: String, team2: String, best_of: BestOf) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            team1,
            team2,
            best_of,
            game_number: 1,
            series_id: Some(Uuid::new_v4()),
            status: MatchStatus::Open,
            result_draft: None,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// The following game of this series, if the series has games left
    pub fn next_game(&self) -> Option<Match> {
        let series_id = self.series_id?;
        if self.game_number >= self.best_of.max_games() {
            return None;
        }

        Some(Self {
            id: Uuid::new_v4(),
            event_id: self.event_id,
            team1: self.team1.clone(),
            team2: self.team2.clone(),
            best_of: self.best_of,
            game_number: self.game_number + 1,
            series_id: Some(series_id),
            status: MatchStatus::Open,
            result_draft: None,
            created_at: chrono::Utc::now().naive_utc(),
        })
    }

    pub fn is_open(&self) -> bool {
        self.status == MatchStatus::Open
    }
}
