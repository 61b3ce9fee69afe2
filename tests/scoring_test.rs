mod helpers;

use helpers::*;
use pickem_backend::error::AppError;
use pickem_backend::models::*;
use pickem_backend::store::DraftStore;
use std::collections::BTreeSet;
use std::sync::Arc;

// ============================================================================
// Match Resolution
// ============================================================================

#[tokio::test]
async fn test_resolve_scores_every_bet_and_updates_aggregates() {
    let fx = Fixture::new(BestOf::Bo1).await;
    fx.player("u1", "alice").await;
    fx.player("u2", "bob").await;

    fx.bet("u1", fx.game.id, reference_draft()).await;
    fx.bet("u2", fx.game.id, draft_with_misses(4)).await;
    fx.lock(fx.game.id).await;

    let report = fx
        .state
        .matches
        .resolve_match(&admin(), fx.game.id, &reference_draft())
        .await
        .expect("Failed to resolve match");

    assert_eq!(report.bets_scored, 2);
    assert!(report.is_fully_applied());
    assert!(report.next_game.is_none(), "Bo1 has no next game");

    let alice = fx.user("u1").await;
    assert_eq!(alice.total_score, 12);
    assert_eq!(alice.event_score(fx.event.id), 12);
    assert!(alice.has_badge("first_bet"));
    assert!(alice.has_badge("perfect_score"));
    assert!(alice.has_badge("top_10"));

    let bob = fx.user("u2").await;
    assert_eq!(bob.total_score, 6);
    assert_eq!(bob.event_score(fx.event.id), 6);
    assert!(!bob.has_badge("perfect_score"));

    let bets = fx.store.find_bets_by_match(fx.game.id).await.unwrap();
    let alice_bet = bets.iter().find(|b| b.user_id == "u1").unwrap();
    assert_eq!(alice_bet.score, Some(12));
    assert!(alice_bet.is_perfect_score);
    assert_eq!(alice_bet.status, BetStatus::Scored);
    let bob_bet = bets.iter().find(|b| b.user_id == "u2").unwrap();
    assert_eq!(bob_bet.score, Some(6));
    assert!(!bob_bet.is_perfect_score);

    let game = fx.store.find_match(fx.game.id).await.unwrap().unwrap();
    assert_eq!(game.status, MatchStatus::Completed);
    assert_eq!(game.result_draft, Some(reference_draft()));
}

#[tokio::test]
async fn test_nine_of_ten_scores_nine_without_bonus() {
    let fx = Fixture::new(BestOf::Bo1).await;
    fx.player("u1", "alice").await;

    fx.bet("u1", fx.game.id, draft_with_misses(1)).await;
    fx.lock(fx.game.id).await;
    fx.state
        .matches
        .resolve_match(&admin(), fx.game.id, &reference_draft())
        .await
        .unwrap();

    let alice = fx.user("u1").await;
    assert_eq!(alice.total_score, 9);
    assert!(!alice.has_badge("perfect_score"));
}

#[tokio::test]
async fn test_partial_prediction_scores_filled_slots_only() {
    let fx = Fixture::new(BestOf::Bo1).await;
    fx.player("u1", "alice").await;

    let mut partial = Draft::default();
    partial.team1.set(Role::Top, "Aatrox");
    partial.team2.set(Role::Mid, "Orianna");
    partial.team2.set(Role::Bot, "Ezreal");
    fx.bet("u1", fx.game.id, partial).await;
    fx.lock(fx.game.id).await;

    fx.state
        .matches
        .resolve_match(&admin(), fx.game.id, &reference_draft())
        .await
        .unwrap();

    assert_eq!(fx.user("u1").await.total_score, 2);
}

#[tokio::test]
async fn test_resolve_without_bets_completes_match() {
    let fx = Fixture::new(BestOf::Bo1).await;
    fx.lock(fx.game.id).await;

    let report = fx
        .state
        .matches
        .resolve_match(&admin(), fx.game.id, &reference_draft())
        .await
        .unwrap();

    assert_eq!(report.bets_scored, 0);
    assert!(report.user_updates.is_empty());
    let game = fx.store.find_match(fx.game.id).await.unwrap().unwrap();
    assert_eq!(game.status, MatchStatus::Completed);
}

#[tokio::test]
async fn test_resolve_requires_locked_match() {
    let fx = Fixture::new(BestOf::Bo1).await;

    let err = fx
        .state
        .matches
        .resolve_match(&admin(), fx.game.id, &reference_draft())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));
}

#[tokio::test]
async fn test_resolve_rejects_incomplete_or_duplicate_drafts() {
    let fx = Fixture::new(BestOf::Bo1).await;
    fx.lock(fx.game.id).await;

    let mut incomplete = reference_draft();
    incomplete.team2.set(Role::Support, "");
    let err = fx
        .state
        .matches
        .resolve_match(&admin(), fx.game.id, &incomplete)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));

    let mut duplicate = reference_draft();
    duplicate.team2.set(Role::Mid, "Ahri");
    let err = fx
        .state
        .matches
        .resolve_match(&admin(), fx.game.id, &duplicate)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));

    let game = fx.store.find_match(fx.game.id).await.unwrap().unwrap();
    assert_eq!(game.status, MatchStatus::Locked);
}

#[tokio::test]
async fn test_resolve_requires_admin() {
    let fx = Fixture::new(BestOf::Bo1).await;
    fx.player("u1", "alice").await;
    fx.lock(fx.game.id).await;

    let err = fx
        .state
        .matches
        .resolve_match(&caller("u1"), fx.game.id, &reference_draft())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied(_)));

    let err = fx
        .state
        .matches
        .resolve_match(&caller(""), fx.game.id, &reference_draft())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated(_)));
}

#[tokio::test]
async fn test_reresolving_applies_only_the_difference() {
    let fx = Fixture::new(BestOf::Bo1).await;
    fx.player("u1", "alice").await;
    fx.bet("u1", fx.game.id, reference_draft()).await;
    fx.lock(fx.game.id).await;

    fx.state
        .matches
        .resolve_match(&admin(), fx.game.id, &reference_draft())
        .await
        .unwrap();
    assert_eq!(fx.user("u1").await.total_score, 12);

    // Admin corrects the result: two picks were entered wrong
    fx.state.matches.reopen_match(&admin(), fx.game.id).await.unwrap();
    fx.lock(fx.game.id).await;
    let report = fx
        .state
        .matches
        .resolve_match(&admin(), fx.game.id, &draft_with_misses(2))
        .await
        .unwrap();

    assert_eq!(report.user_updates.len(), 1);
    assert_eq!(report.user_updates[0].points_added, -4);

    let alice = fx.user("u1").await;
    assert_eq!(alice.total_score, 8);
    assert_eq!(alice.event_score(fx.event.id), 8);
    assert!(alice.has_badge("perfect_score"), "badges are never revoked");
}

// ============================================================================
// Failure Handling
// ============================================================================

#[tokio::test]
async fn test_batch_failure_leaves_no_state_change() {
    let store = Arc::new(FaultyStore::new());
    let fx = Fixture::with_store(store.clone(), BestOf::Bo3).await;
    fx.player("u1", "alice").await;
    fx.bet("u1", fx.game.id, reference_draft()).await;
    fx.lock(fx.game.id).await;

    store.fail_batches(true);
    let err = fx
        .state
        .matches
        .resolve_match(&admin(), fx.game.id, &reference_draft())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BatchWriteFailure(_)));
    assert_eq!(err.kind(), "aborted");

    let game = fx.store.find_match(fx.game.id).await.unwrap().unwrap();
    assert_eq!(game.status, MatchStatus::Locked);
    assert!(game.result_draft.is_none());

    let bets = fx.store.find_bets_by_match(fx.game.id).await.unwrap();
    assert!(bets.iter().all(|b| b.score.is_none() && b.status == BetStatus::Pending));
    assert_eq!(fx.user("u1").await.total_score, 0);

    let series = fx
        .store
        .find_matches_by_series(fx.game.series_id.unwrap(), None)
        .await
        .unwrap();
    assert_eq!(series.len(), 1, "no next game after a failed batch");

    // Fully recoverable once the store is healthy again
    store.heal();
    fx.state
        .matches
        .resolve_match(&admin(), fx.game.id, &reference_draft())
        .await
        .unwrap();
    assert_eq!(fx.user("u1").await.total_score, 12);
}

#[tokio::test]
async fn test_aggregate_failure_is_reported_not_rolled_back() {
    let store = Arc::new(FaultyStore::new());
    let fx = Fixture::with_store(store.clone(), BestOf::Bo1).await;
    fx.player("u1", "alice").await;
    fx.player("u2", "bob").await;
    fx.bet("u1", fx.game.id, reference_draft()).await;
    fx.bet("u2", fx.game.id, draft_with_misses(4)).await;
    fx.lock(fx.game.id).await;

    store.fail_increments_for("u2");
    let report = fx
        .state
        .matches
        .resolve_match(&admin(), fx.game.id, &reference_draft())
        .await
        .expect("Resolution commits despite aggregate failures");

    assert!(!report.is_fully_applied());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].user_id, "u2");
    assert!(matches!(
        report.partial_failure(),
        Some(AppError::PartialAggregateFailure {
            failed: 1,
            attempted: 2
        })
    ));

    assert_eq!(fx.user("u1").await.total_score, 12);
    // The bet keeps its score while the aggregate lags behind
    assert_eq!(fx.user("u2").await.total_score, 0);
    let bob_bet = fx
        .store
        .find_bet_for_user_and_match("u2", fx.game.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bob_bet.score, Some(6));
}

// ============================================================================
// Series
// ============================================================================

#[tokio::test]
async fn test_series_continues_and_excludes_used_champions() {
    let fx = Fixture::new(BestOf::Bo3).await;
    fx.player("u1", "alice").await;
    fx.lock(fx.game.id).await;

    let report = fx
        .state
        .matches
        .resolve_match(&admin(), fx.game.id, &reference_draft())
        .await
        .unwrap();
    let game2 = report.next_game.expect("Game 2 should be created");
    assert_eq!(game2.game_number, 2);
    assert_eq!(game2.series_id, fx.game.series_id);
    assert_eq!(game2.status, MatchStatus::Open);
    assert_eq!(game2.team1, fx.game.team1);

    let excluded = fx.state.matches.excluded_champions(game2.id).await.unwrap();
    assert_eq!(excluded, reference_draft().champions());
    assert!(fx.state.matches.excluded_champions(fx.game.id).await.unwrap().is_empty());

    let mut reused = other_draft();
    reused.team1.set(Role::Mid, "Ahri");
    let err = fx
        .state
        .betting
        .place_bet(&caller("u1"), game2.id, reused)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));

    fx.bet("u1", game2.id, other_draft()).await;
    fx.lock(game2.id).await;

    let err = fx
        .state
        .matches
        .resolve_match(&admin(), game2.id, &reference_draft())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));

    let report = fx
        .state
        .matches
        .resolve_match(&admin(), game2.id, &other_draft())
        .await
        .unwrap();
    let game3 = report.next_game.expect("Game 3 should be created");
    assert_eq!(game3.game_number, 3);

    let excluded: BTreeSet<String> = fx.state.matches.excluded_champions(game3.id).await.unwrap();
    assert_eq!(excluded.len(), 20);
    assert_eq!(fx.user("u1").await.total_score, 12);
}

#[tokio::test]
async fn test_failed_series_lookup_excludes_nothing() {
    let store = Arc::new(FaultyStore::new());
    let fx = Fixture::with_store(store.clone(), BestOf::Bo3).await;
    fx.player("u1", "alice").await;
    fx.lock(fx.game.id).await;
    let game2 = fx
        .state
        .matches
        .resolve_match(&admin(), fx.game.id, &reference_draft())
        .await
        .unwrap()
        .next_game
        .expect("Game 2 should be created");

    store.fail_series_lookups(true);
    let excluded = fx.state.matches.excluded_champions(game2.id).await.unwrap();
    assert!(excluded.is_empty());

    // Game 1 champions are accepted while exclusions cannot be loaded
    let placed = fx
        .state
        .betting
        .place_bet(&caller("u1"), game2.id, reference_draft())
        .await
        .expect("Bet placement does not depend on the series lookup");
    assert!(placed.created);
}

#[tokio::test]
async fn test_reresolving_does_not_duplicate_next_game() {
    let fx = Fixture::new(BestOf::Bo3).await;
    fx.lock(fx.game.id).await;

    fx.state
        .matches
        .resolve_match(&admin(), fx.game.id, &reference_draft())
        .await
        .unwrap();
    fx.state.matches.reopen_match(&admin(), fx.game.id).await.unwrap();
    fx.lock(fx.game.id).await;

    let report = fx
        .state
        .matches
        .resolve_match(&admin(), fx.game.id, &reference_draft())
        .await
        .unwrap();
    assert!(report.next_game.is_none());
    assert!(report.next_game_error.is_none());

    let series = fx
        .store
        .find_matches_by_series(fx.game.series_id.unwrap(), None)
        .await
        .unwrap();
    assert_eq!(series.len(), 2);
}

#[tokio::test]
async fn test_last_game_of_series_ends_it() {
    let fx = Fixture::new(BestOf::Bo1).await;
    fx.lock(fx.game.id).await;
    fx.state
        .matches
        .resolve_match(&admin(), fx.game.id, &reference_draft())
        .await
        .unwrap();

    let matches = fx.state.matches.list_matches(fx.event.id).await.unwrap();
    assert_eq!(matches.len(), 1);
}

#[tokio::test]
async fn test_concurrent_resolutions_do_not_lose_points() {
    let fx = Fixture::new(BestOf::Bo1).await;
    fx.player("u1", "alice").await;
    let second = fx
        .state
        .matches
        .create_match(&admin(), fx.event.id, "MAD Lions", "Vitality", BestOf::Bo1)
        .await
        .unwrap();

    fx.bet("u1", fx.game.id, reference_draft()).await;
    fx.bet("u1", second.id, draft_with_misses(1)).await;
    fx.lock(fx.game.id).await;
    fx.lock(second.id).await;

    let admin = admin();
    let reference = reference_draft();
    let (first, other) = futures::future::join(
        fx.state.matches.resolve_match(&admin, fx.game.id, &reference),
        fx.state.matches.resolve_match(&admin, second.id, &reference),
    )
    .await;
    tokio_test::assert_ok!(first);
    tokio_test::assert_ok!(other);

    let alice = fx.user("u1").await;
    assert_eq!(alice.total_score, 21);
    assert_eq!(alice.event_score(fx.event.id), 21);
}
