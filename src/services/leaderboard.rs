use crate::error::AppResult;
use crate::models::User;
use crate::store::DraftStore;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// One row of a leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// 1-based
    pub rank: usize,
    pub user_id: String,
    pub username: String,
    pub points: i64,
    pub badge_count: usize,
}

/// Sort users by `points` descending, ties broken by user id
fn sorted_by<'a, F>(users: &'a [User], points: F) -> Vec<(&'a User, i64)>
where
    F: Fn(&User) -> i64,
{
    let mut ranked: Vec<(&User, i64)> = users.iter().map(|u| (u, points(u))).collect();
    ranked.sort_by(|(a, pa), (b, pb)| pb.cmp(pa).then_with(|| a.id.cmp(&b.id)));
    ranked
}

/// Ranked rows for users with more than zero points
pub fn rank_users<F>(users: &[User], points: F) -> Vec<LeaderboardEntry>
where
    F: Fn(&User) -> i64,
{
    sorted_by(users, points)
        .into_iter()
        .filter(|(_, p)| *p > 0)
        .enumerate()
        .map(|(i, (user, p))| LeaderboardEntry {
            rank: i + 1,
            user_id: user.id.clone(),
            username: user.username.clone(),
            points: p,
            badge_count: user.badges.len(),
        })
        .collect()
}

/// Position of a user among all users ordered by total score
pub fn global_rank(users: &[User], user_id: &str) -> Option<usize> {
    sorted_by(users, |u| u.total_score)
        .iter()
        .position(|(u, _)| u.id == user_id)
        .map(|i| i + 1)
}

/// Read-only leaderboards
pub struct LeaderboardService {
    store: Arc<dyn DraftStore>,
}

impl LeaderboardService {
    pub fn new(store: Arc<dyn DraftStore>) -> Self {
        Self { store }
    }

    /// Everyone with points, by total score
    pub async fn global(&self, limit: Option<usize>) -> AppResult<Vec<LeaderboardEntry>> {
        let users = self.store.list_users().await?;
        let mut entries = rank_users(&users, |u| u.total_score);
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    /// Everyone with points in one event, by event score
    pub async fn for_event(&self, event_id: Uuid, limit: Option<usize>) -> AppResult<Vec<LeaderboardEntry>> {
        let users = self.store.list_users().await?;
        let mut entries = rank_users(&users, |u| u.event_score(event_id));
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }
}
