use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Lane assignment within a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Top,
    Jungle,
    Mid,
    Bot,
    Support,
}

impl Role {
    /// All roles in draft order
    pub const ALL: [Role; 5] = [Role::Top, Role::Jungle, Role::Mid, Role::Bot, Role::Support];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Top => "Top",
            Role::Jungle => "Jungle",
            Role::Mid => "Mid",
            Role::Bot => "Bot",
            Role::Support => "Support",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the two teams in a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamSide {
    Team1,
    Team2,
}

impl TeamSide {
    pub const BOTH: [TeamSide; 2] = [TeamSide::Team1, TeamSide::Team2];
}

/// Champion picked per role for one team. Empty names count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleMap(BTreeMap<Role, String>);

impl RoleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a full map from picks given in `Role::ALL` order
    pub fn from_picks(picks: [&str; 5]) -> Self {
        let mut map = Self::new();
        for (role, champion) in Role::ALL.into_iter().zip(picks) {
            map.set(role, champion);
        }
        map
    }

    /// Champion for a role, `None` when absent or blank
    pub fn get(&self, role: Role) -> Option<&str> {
        self.0
            .get(&role)
            .map(|s| s.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    pub fn set(&mut self, role: Role, champion: impl Into<String>) {
        self.0.insert(role, champion.into());
    }

    /// Whether every role has a champion
    pub fn is_complete(&self) -> bool {
        Role::ALL.iter().all(|role| self.get(*role).is_some())
    }

    /// Picked champions, roles without a pick skipped
    pub fn champions(&self) -> impl Iterator<Item = (Role, &str)> {
        Role::ALL
            .into_iter()
            .filter_map(move |role| self.get(role).map(|champ| (role, champ)))
    }
}

/// Picks for both teams of one game
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default)]
    pub team1: RoleMap,
    #[serde(default)]
    pub team2: RoleMap,
}

impl Draft {
    pub fn new(team1: RoleMap, team2: RoleMap) -> Self {
        Self { team1, team2 }
    }

    pub fn side(&self, side: TeamSide) -> &RoleMap {
        match side {
            TeamSide::Team1 => &self.team1,
            TeamSide::Team2 => &self.team2,
        }
    }

    pub fn side_mut(&mut self, side: TeamSide) -> &mut RoleMap {
        match side {
            TeamSide::Team1 => &mut self.team1,
            TeamSide::Team2 => &mut self.team2,
        }
    }

    /// All ten slots filled
    pub fn is_complete(&self) -> bool {
        self.team1.is_complete() && self.team2.is_complete()
    }

    /// Every non-empty pick with its slot
    pub fn slots(&self) -> impl Iterator<Item = (TeamSide, Role, &str)> {
        TeamSide::BOTH.into_iter().flat_map(move |side| {
            self.side(side)
                .champions()
                .map(move |(role, champ)| (side, role, champ))
        })
    }

    /// Distinct champions across both teams
    pub fn champions(&self) -> BTreeSet<String> {
        self.slots().map(|(_, _, champ)| champ.to_string()).collect()
    }

    /// Champions picked in more than one slot
    pub fn duplicate_champions(&self) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut duplicates = BTreeSet::new();
        for (_, _, champ) in self.slots() {
            if !seen.insert(champ) {
                duplicates.insert(champ.to_string());
            }
        }
        duplicates
    }

    /// Champions picked anywhere except the given slot
    pub fn picked_elsewhere(&self, side: TeamSide, role: Role) -> BTreeSet<String> {
        self.slots()
            .filter(|(s, r, _)| !(*s == side && *r == role))
            .map(|(_, _, champ)| champ.to_string())
            .collect()
    }
}
