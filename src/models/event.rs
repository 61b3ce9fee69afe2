use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Event status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Active,
    Closed,
}

impl EventStatus {
    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Active => "active",
            EventStatus::Closed => "closed",
        }
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(EventStatus::Active),
            "closed" => Ok(EventStatus::Closed),
            _ => Err(format!("Invalid event status: {}", s)),
        }
    }
}

impl From<EventStatus> for String {
    fn from(status: EventStatus) -> Self {
        status.as_str().to_string()
    }
}

/// A tournament or split that groups matches (e.g. "LEC Spring 2024")
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: EventStatus,
    pub created_at: NaiveDateTime,
}

impl Event {
    /// Create a new active Event
    pub fn new(name: String, description: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            status: EventStatus::Active,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Check if event is active
    pub fn is_active(&self) -> bool {
        self.status == EventStatus::Active
    }
}
