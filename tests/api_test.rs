mod helpers;

use helpers::*;
use pickem_backend::api::{ApiHandler, ApiRequest, ApiResponse};
use pickem_backend::store::{DraftStore, MemoryDraftStore};
use pickem_backend::websocket::WebSocketServer;
use serde_json::{json, Value};
use std::sync::Arc;

struct Harness {
    store: Arc<dyn DraftStore>,
    handler: ApiHandler,
}

impl Harness {
    async fn new() -> Self {
        Self::with_store(Arc::new(MemoryDraftStore::new())).await
    }

    async fn with_store(store: Arc<dyn DraftStore>) -> Self {
        seed_user(store.as_ref(), ADMIN_ID, "admin", true).await;
        let state = Arc::new(build_state(store.clone()));
        Self {
            store,
            handler: ApiHandler::new(state, WebSocketServer::new()),
        }
    }

    async fn call(&self, caller_id: &str, body: Value) -> ApiResponse {
        let mut body = body;
        body["request_id"] = json!("req-1");
        body["caller_id"] = json!(caller_id);
        let request: ApiRequest = serde_json::from_value(body).expect("Invalid request");
        self.handler.handle(request).await
    }

    async fn ok(&self, caller_id: &str, body: Value) -> Value {
        let response = self.call(caller_id, body).await;
        assert!(response.ok, "request failed: {:?}", response.error);
        response.data.expect("Missing data")
    }
}

fn draft_json(draft: &pickem_backend::models::Draft) -> Value {
    serde_json::to_value(draft).unwrap()
}

#[tokio::test]
async fn test_full_flow_over_json() {
    let h = Harness::new().await;

    let user = h
        .ok("u1", json!({"type": "register", "username": "alice", "email": "alice@example.com"}))
        .await;
    assert_eq!(user["username"], "alice");
    assert_eq!(user["totalScore"], 0);

    let event = h
        .ok(ADMIN_ID, json!({"type": "create_event", "name": "Worlds 2024"}))
        .await;
    let event_id = event["id"].as_str().unwrap().to_string();

    let game = h
        .ok(
            ADMIN_ID,
            json!({"type": "create_match", "event_id": event_id, "team1": "T1", "team2": "BLG", "best_of": "bo5"}),
        )
        .await;
    let match_id = game["id"].as_str().unwrap().to_string();
    assert_eq!(game["gameNumber"], 1);
    assert_eq!(game["status"], "open");

    let bet = h
        .ok(
            "u1",
            json!({"type": "place_bet", "match_id": match_id, "predictions": draft_json(&reference_draft())}),
        )
        .await;
    assert_eq!(bet["created"], true);
    assert_eq!(bet["newBadges"], json!(["first_bet"]));

    h.ok(ADMIN_ID, json!({"type": "lock_match", "match_id": match_id})).await;

    let response = h
        .call(
            ADMIN_ID,
            json!({"type": "resolve_match", "match_id": match_id, "result_draft": draft_json(&reference_draft())}),
        )
        .await;
    assert!(response.ok);
    assert!(response.warning.is_none());
    let report = response.data.unwrap();
    assert_eq!(report["betsScored"], 1);
    assert_eq!(report["nextGame"]["gameNumber"], 2);

    let board = h.ok("", json!({"type": "global_leaderboard", "limit": 10})).await;
    assert_eq!(board[0]["userId"], "u1");
    assert_eq!(board[0]["points"], 12);

    let next_id = report["nextGame"]["id"].as_str().unwrap().to_string();
    let excluded = h
        .ok("u1", json!({"type": "excluded_champions", "match_id": next_id}))
        .await;
    assert_eq!(excluded.as_array().unwrap().len(), 10);

    let profile = h.ok("", json!({"type": "get_profile", "user_id": "u1"})).await;
    assert_eq!(profile["stats"]["perfectScores"], 1);

    let removed = h
        .ok(ADMIN_ID, json!({"type": "delete_match", "match_id": match_id}))
        .await;
    assert_eq!(removed["pointsRemoved"]["u1"], 12);
    assert_eq!(h.store.find_user("u1").await.unwrap().unwrap().total_score, 0);
}

/// Registers alice, opens a series of `best_of` and has her bet on game 1,
/// leaving it locked. Returns the game 1 id.
async fn locked_series(h: &Harness, best_of: &str) -> String {
    h.ok("u1", json!({"type": "register", "username": "alice", "email": "alice@example.com"}))
        .await;
    let event = h
        .ok(ADMIN_ID, json!({"type": "create_event", "name": "MSI 2024"}))
        .await;
    let game = h
        .ok(
            ADMIN_ID,
            json!({"type": "create_match", "event_id": event["id"], "team1": "GAM", "team2": "PSG", "best_of": best_of}),
        )
        .await;
    let match_id = game["id"].as_str().unwrap().to_string();
    h.ok(
        "u1",
        json!({"type": "place_bet", "match_id": match_id, "predictions": draft_json(&reference_draft())}),
    )
    .await;
    h.ok(ADMIN_ID, json!({"type": "lock_match", "match_id": match_id})).await;
    match_id
}

#[tokio::test]
async fn test_missing_next_game_is_a_warning() {
    let store = Arc::new(FaultyStore::new());
    let h = Harness::with_store(store.clone()).await;
    let match_id = locked_series(&h, "bo3").await;

    store.fail_match_inserts(true);
    let response = h
        .call(
            ADMIN_ID,
            json!({"type": "resolve_match", "match_id": match_id, "result_draft": draft_json(&reference_draft())}),
        )
        .await;

    assert!(response.ok);
    assert_eq!(response.warning.unwrap().kind, "partial-failure");
    let report = response.data.unwrap();
    assert_eq!(report["betsScored"], 1);
    assert!(report["nextGame"].is_null());
    assert!(report["nextGameError"].is_string());
    assert_eq!(h.store.find_user("u1").await.unwrap().unwrap().total_score, 12);
}

#[tokio::test]
async fn test_failed_delete_correction_is_a_warning_and_keeps_match() {
    let store = Arc::new(FaultyStore::new());
    let h = Harness::with_store(store.clone()).await;
    let match_id = locked_series(&h, "bo1").await;
    h.ok(
        ADMIN_ID,
        json!({"type": "resolve_match", "match_id": match_id, "result_draft": draft_json(&reference_draft())}),
    )
    .await;

    store.fail_decrements_for("u1");
    let response = h
        .call(ADMIN_ID, json!({"type": "delete_match", "match_id": match_id}))
        .await;

    assert!(response.ok);
    assert_eq!(response.warning.unwrap().kind, "partial-failure");
    assert_eq!(response.data.unwrap()["deletedMatches"], 0);
    let game = h.ok("u1", json!({"type": "get_match", "match_id": match_id})).await;
    assert_eq!(game["status"], "completed");
    assert_eq!(h.store.find_user("u1").await.unwrap().unwrap().total_score, 12);
}

#[tokio::test]
async fn test_errors_carry_kind_and_request_id() {
    let h = Harness::new().await;

    let response = h
        .call("", json!({"type": "register", "username": "bob", "email": "bob@example.com"}))
        .await;
    assert!(!response.ok);
    assert_eq!(response.request_id, "req-1");
    assert_eq!(response.error.unwrap().kind, "unauthenticated");

    h.ok("u1", json!({"type": "register", "username": "alice", "email": "alice@example.com"}))
        .await;
    let response = h.call("u1", json!({"type": "create_event", "name": "Sneaky Cup"})).await;
    assert_eq!(response.error.unwrap().kind, "permission-denied");

    let response = h
        .call("u1", json!({"type": "get_match", "match_id": uuid::Uuid::new_v4()}))
        .await;
    assert_eq!(response.error.unwrap().kind, "not-found");

    let response = h.call(ADMIN_ID, json!({"type": "adjust_score", "username": "alice", "points": 0})).await;
    assert_eq!(response.error.unwrap().kind, "invalid-argument");
}

#[tokio::test]
async fn test_success_responses_omit_error_fields() {
    let h = Harness::new().await;
    let response = h.call("", json!({"type": "champions"})).await;
    assert!(response.ok);

    let wire = serde_json::to_value(&response).unwrap();
    assert!(wire.get("error").is_none());
    assert!(wire.get("warning").is_none());
    assert_eq!(wire["data"]["version"], "14.1.1");
}

#[test]
fn test_unknown_request_type_is_rejected() {
    let parsed = serde_json::from_value::<ApiRequest>(json!({
        "request_id": "r",
        "caller_id": "u1",
        "type": "drop_tables"
    }));
    assert!(parsed.is_err());
}

#[test]
fn test_request_without_caller_is_anonymous() {
    let parsed: ApiRequest = serde_json::from_value(json!({
        "request_id": "r",
        "type": "list_events"
    }))
    .unwrap();
    assert_eq!(parsed.caller_id, "");
}
