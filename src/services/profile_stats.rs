use crate::error::{AppError, AppResult};
use crate::models::{Bet, Match, Role, TeamSide, User};
use crate::store::DraftStore;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// Score at which a bet counts as a win
pub const WIN_THRESHOLD: i64 = 5;
const TOP_CHAMPIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampionAccuracy {
    pub name: String,
    pub correct: u32,
    pub total: u32,
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub total_bets: usize,
    pub scored_bets: usize,
    pub total_points: i64,
    pub average_score: f64,
    pub perfect_scores: usize,
    /// Percentage of scored bets at or above the win threshold
    pub win_rate: f64,
    pub role_accuracy: BTreeMap<Role, f64>,
    pub top_champions: Vec<ChampionAccuracy>,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round1(part as f64 / whole as f64 * 100.0)
    }
}

#[derive(Default)]
struct Tally {
    correct: u32,
    total: u32,
}

/// Statistics over a user's bets. `matches` supplies the result drafts;
/// bets on matches without one count toward totals but not accuracy.
pub fn compute_stats(bets: &[Bet], matches: &HashMap<Uuid, Match>) -> ProfileStats {
    let scored: Vec<&Bet> = bets.iter().filter(|b| b.is_scored()).collect();
    let total_points: i64 = scored.iter().map(|b| b.points()).sum();
    let wins = scored.iter().filter(|b| b.points() >= WIN_THRESHOLD).count();

    let mut roles: BTreeMap<Role, Tally> = Role::ALL.iter().map(|r| (*r, Tally::default())).collect();
    let mut champions: HashMap<String, Tally> = HashMap::new();

    for bet in &scored {
        let Some(result) = matches.get(&bet.match_id).and_then(|m| m.result_draft.as_ref()) else {
            continue;
        };

        for side in TeamSide::BOTH {
            for role in Role::ALL {
                let predicted = bet.predictions.side(side).get(role);
                let hit = predicted.is_some() && predicted == result.side(side).get(role);

                if let Some(tally) = roles.get_mut(&role) {
                    tally.total += 1;
                    if hit {
                        tally.correct += 1;
                    }
                }
                if let Some(champ) = predicted {
                    let tally = champions.entry(champ.to_string()).or_default();
                    tally.total += 1;
                    if hit {
                        tally.correct += 1;
                    }
                }
            }
        }
    }

    let mut top_champions: Vec<ChampionAccuracy> = champions
        .into_iter()
        .map(|(name, t)| ChampionAccuracy {
            name,
            correct: t.correct,
            total: t.total,
            accuracy: percentage(t.correct, t.total),
        })
        .collect();
    top_champions.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    top_champions.truncate(TOP_CHAMPIONS);

    ProfileStats {
        total_bets: bets.len(),
        scored_bets: scored.len(),
        total_points,
        average_score: if scored.is_empty() {
            0.0
        } else {
            round1(total_points as f64 / scored.len() as f64)
        },
        perfect_scores: bets.iter().filter(|b| b.is_perfect_score).count(),
        win_rate: percentage(wins as u32, scored.len() as u32),
        role_accuracy: roles
            .into_iter()
            .map(|(role, t)| (role, percentage(t.correct, t.total)))
            .collect(),
        top_champions,
    }
}

/// A user's public profile with stats
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user: User,
    pub stats: ProfileStats,
}

pub struct ProfileStatsService {
    store: Arc<dyn DraftStore>,
}

impl ProfileStatsService {
    pub fn new(store: Arc<dyn DraftStore>) -> Self {
        Self { store }
    }

    pub async fn profile(&self, user_id: &str) -> AppResult<UserProfile> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let bets = self.store.find_bets_by_user(user_id).await?;

        let match_ids: HashSet<Uuid> = bets.iter().map(|b| b.match_id).collect();
        let mut matches = HashMap::with_capacity(match_ids.len());
        for match_id in match_ids {
            if let Some(game) = self.store.find_match(match_id).await? {
                matches.insert(match_id, game);
            }
        }

        Ok(UserProfile {
            stats: compute_stats(&bets, &matches),
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BestOf, Draft, MatchStatus, RoleMap};

    fn completed_match(result: Draft) -> Match {
        let mut game = Match::new_series(Uuid::new_v4(), "G2".into(), "FNC".into(), BestOf::Bo1);
        game.status = MatchStatus::Completed;
        game.result_draft = Some(result);
        game
    }

    fn scored_bet(game: &Match, predictions: Draft, score: i64) -> Bet {
        let mut bet = Bet::new("u1".into(), game.id, game.event_id, predictions);
        bet.score = Some(score);
        bet.is_perfect_score = score == 12;
        bet
    }

    #[test]
    fn test_empty_history() {
        let stats = compute_stats(&[], &HashMap::new());
        assert_eq!(stats.total_bets, 0);
        assert_eq!(stats.average_score, 0.0);
        assert_eq!(stats.win_rate, 0.0);
        assert!(stats.top_champions.is_empty());
        assert_eq!(stats.role_accuracy[&Role::Top], 0.0);
    }

    #[test]
    fn test_stats_over_scored_bets() {
        let result = Draft::new(
            RoleMap::from_picks(["Aatrox", "Lee Sin", "Ahri", "Jinx", "Thresh"]),
            RoleMap::from_picks(["Gnar", "Vi", "Orianna", "Kai'Sa", "Nautilus"]),
        );
        let game_a = completed_match(result.clone());
        let game_b = completed_match(result.clone());

        let mut miss = result.clone();
        miss.team1.set(Role::Top, "Renekton");
        miss.team2.set(Role::Top, "Renekton2");
        let pending = Bet::new("u1".into(), Uuid::new_v4(), Uuid::new_v4(), Draft::default());

        let bets = vec![
            scored_bet(&game_a, result.clone(), 12),
            scored_bet(&game_b, miss, 8),
            pending,
        ];
        let matches: HashMap<Uuid, Match> =
            [(game_a.id, game_a.clone()), (game_b.id, game_b.clone())].into_iter().collect();

        let stats = compute_stats(&bets, &matches);
        assert_eq!(stats.total_bets, 3);
        assert_eq!(stats.scored_bets, 2);
        assert_eq!(stats.total_points, 20);
        assert_eq!(stats.average_score, 10.0);
        assert_eq!(stats.perfect_scores, 1);
        assert_eq!(stats.win_rate, 100.0);
        assert_eq!(stats.role_accuracy[&Role::Top], 50.0);
        assert_eq!(stats.role_accuracy[&Role::Mid], 100.0);
        assert_eq!(stats.top_champions.len(), 10);
        assert_eq!(stats.top_champions[0].total, 2);
    }
}
