use crate::config::RetryConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Draft, Match, MatchStatus, Role, TeamSide};
use crate::store::DraftStore;
use crate::utils::retry_with_backoff;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

/// Champions a slot may not take: every pick on another slot of the draft
/// plus the series exclusions
pub fn unavailable_for_slot(
    draft: &Draft,
    side: TeamSide,
    role: Role,
    series_excluded: &BTreeSet<String>,
) -> BTreeSet<String> {
    let mut unavailable = draft.picked_elsewhere(side, role);
    unavailable.extend(series_excluded.iter().cloned());
    unavailable
}

/// Reject drafts that reuse a champion within themselves or across the series.
/// With `require_complete` every one of the ten slots must be filled.
pub fn validate_draft(
    draft: &Draft,
    series_excluded: &BTreeSet<String>,
    require_complete: bool,
) -> AppResult<()> {
    if require_complete {
        for side in TeamSide::BOTH {
            for role in Role::ALL {
                if draft.side(side).get(role).is_none() {
                    return Err(AppError::InvalidArgument(format!(
                        "Missing {:?} {} pick",
                        side, role
                    )));
                }
            }
        }
    }

    let duplicates = draft.duplicate_champions();
    if !duplicates.is_empty() {
        return Err(AppError::InvalidArgument(format!(
            "Champions picked more than once: {}",
            duplicates.into_iter().collect::<Vec<_>>().join(", ")
        )));
    }

    let reused: Vec<String> = draft
        .champions()
        .into_iter()
        .filter(|champ| series_excluded.contains(champ))
        .collect();
    if !reused.is_empty() {
        return Err(AppError::InvalidArgument(format!(
            "Champions already played earlier in the series: {}",
            reused.join(", ")
        )));
    }

    Ok(())
}

/// Finds champions already used by earlier games of a best-of series
pub struct SeriesExclusionResolver {
    store: Arc<dyn DraftStore>,
    retry: RetryConfig,
}

impl SeriesExclusionResolver {
    pub fn new(store: Arc<dyn DraftStore>, retry: RetryConfig) -> Self {
        Self { store, retry }
    }

    /// Union of the result drafts of every completed game numbered below
    /// `game_number` in the series. Empty when either argument is missing.
    ///
    /// Advisory only: lookup failures are logged and yield an empty set.
    pub async fn excluded_champions(
        &self,
        series_id: Option<Uuid>,
        game_number: Option<u32>,
    ) -> BTreeSet<String> {
        let (Some(series_id), Some(game_number)) = (series_id, game_number) else {
            return BTreeSet::new();
        };
        if game_number <= 1 {
            return BTreeSet::new();
        }

        let completed = retry_with_backoff(&self.retry, "series lookup", move || async move {
            Ok(self
                .store
                .find_matches_by_series(series_id, Some(MatchStatus::Completed))
                .await?)
        })
        .await;

        match completed {
            Ok(games) => games
                .iter()
                .filter(|g| g.game_number < game_number)
                .filter_map(|g| g.result_draft.as_ref())
                .flat_map(|draft| draft.champions())
                .collect(),
            Err(e) => {
                error!("Failed to load excluded champions for series {}: {}", series_id, e);
                BTreeSet::new()
            }
        }
    }

    /// Exclusions for the given match's position in its series
    pub async fn excluded_for_match(&self, game: &Match) -> BTreeSet<String> {
        self.excluded_champions(game.series_id, Some(game.game_number))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BestOf, RoleMap};
    use crate::store::MemoryDraftStore;

    fn full_draft() -> Draft {
        Draft::new(
            RoleMap::from_picks(["Aatrox", "Lee Sin", "Ahri", "Jinx", "Thresh"]),
            RoleMap::from_picks(["Gnar", "Vi", "Orianna", "Kai'Sa", "Nautilus"]),
        )
    }

    #[test]
    fn test_unavailable_for_slot_unions_draft_and_series() {
        let draft = full_draft();
        let series: BTreeSet<String> = ["Zed".to_string()].into_iter().collect();

        let unavailable = unavailable_for_slot(&draft, TeamSide::Team1, Role::Top, &series);
        assert!(!unavailable.contains("Aatrox"));
        assert!(unavailable.contains("Gnar"));
        assert!(unavailable.contains("Thresh"));
        assert!(unavailable.contains("Zed"));
        assert_eq!(unavailable.len(), 10);
    }

    #[test]
    fn test_validate_draft() {
        let none = BTreeSet::new();
        assert!(validate_draft(&full_draft(), &none, true).is_ok());

        let mut partial = Draft::default();
        partial.team1.set(Role::Mid, "Ahri");
        assert!(validate_draft(&partial, &none, false).is_ok());
        assert!(validate_draft(&partial, &none, true).is_err());

        let mut duplicated = full_draft();
        duplicated.team2.set(Role::Mid, "Ahri");
        assert!(validate_draft(&duplicated, &none, true).is_err());

        let series: BTreeSet<String> = ["Jinx".to_string()].into_iter().collect();
        let err = validate_draft(&full_draft(), &series, true).unwrap_err();
        assert_eq!(err.kind(), "invalid-argument");
    }

    #[tokio::test]
    async fn test_excluded_champions_needs_series_and_game_number() {
        let store: Arc<dyn DraftStore> = Arc::new(MemoryDraftStore::new());
        let mut game1 = Match::new_series(Uuid::new_v4(), "G2".into(), "FNC".into(), BestOf::Bo5);
        game1.status = MatchStatus::Completed;
        game1.result_draft = Some(full_draft());
        store.insert_match(&game1).await.unwrap();

        let resolver = SeriesExclusionResolver::new(store, RetryConfig::default());
        assert!(resolver.excluded_champions(None, Some(3)).await.is_empty());
        assert!(resolver.excluded_champions(game1.series_id, None).await.is_empty());
        assert!(resolver.excluded_champions(game1.series_id, Some(1)).await.is_empty());
        assert_eq!(
            resolver.excluded_champions(game1.series_id, Some(3)).await,
            full_draft().champions()
        );
    }
}
