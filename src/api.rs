//! JSON request/response API served over the WebSocket connection.
//!
//! Every request carries a client-chosen `request_id` echoed in the reply and
//! the trusted `caller_id` of whoever issued it.

use crate::auth::Caller;
use crate::error::{AppError, AppResult};
use crate::models::{BestOf, Draft, EventStatus, Socials};
use crate::websocket::WebSocketServer;
use crate::AppState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiRequest {
    pub request_id: String,
    #[serde(default)]
    pub caller_id: String,
    #[serde(flatten)]
    pub call: ApiCall,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiCall {
    Register {
        username: String,
        email: String,
        #[serde(default)]
        socials: Socials,
    },
    UpdateSocials {
        socials: Socials,
    },
    GetProfile {
        user_id: String,
    },
    ListEvents {
        #[serde(default)]
        include_closed: bool,
    },
    CreateEvent {
        name: String,
        #[serde(default)]
        description: String,
    },
    SetEventStatus {
        event_id: Uuid,
        status: EventStatus,
    },
    DeleteEvent {
        event_id: Uuid,
    },
    ListMatches {
        event_id: Uuid,
    },
    GetMatch {
        match_id: Uuid,
    },
    CreateMatch {
        event_id: Uuid,
        team1: String,
        team2: String,
        best_of: BestOf,
    },
    LockMatch {
        match_id: Uuid,
    },
    ReopenMatch {
        match_id: Uuid,
    },
    ExcludedChampions {
        match_id: Uuid,
    },
    ResolveMatch {
        match_id: Uuid,
        result_draft: Draft,
    },
    DeleteMatch {
        match_id: Uuid,
    },
    PlaceBet {
        match_id: Uuid,
        predictions: Draft,
    },
    MyBet {
        match_id: Uuid,
    },
    UserBets {
        user_id: String,
    },
    GlobalLeaderboard {
        limit: Option<usize>,
    },
    EventLeaderboard {
        event_id: Uuid,
        limit: Option<usize>,
    },
    AdjustScore {
        username: String,
        points: i64,
    },
    ResetScores,
    Champions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub kind: String,
    pub message: String,
}

impl From<&AppError> for ApiErrorBody {
    fn from(err: &AppError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub request_id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorBody>,
    /// Set when the call succeeded but some follow-up writes did not
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<ApiErrorBody>,
}

impl ApiResponse {
    pub fn success(request_id: String, data: Value) -> Self {
        Self {
            request_id,
            ok: true,
            data: Some(data),
            error: None,
            warning: None,
        }
    }

    pub fn failure(request_id: String, err: &AppError) -> Self {
        Self {
            request_id,
            ok: false,
            data: None,
            error: Some(err.into()),
            warning: None,
        }
    }
}

/// Routes API calls to the services and publishes change notifications
pub struct ApiHandler {
    state: Arc<AppState>,
    notifier: WebSocketServer,
}

struct Outcome {
    data: Value,
    warning: Option<AppError>,
}

impl From<Value> for Outcome {
    fn from(data: Value) -> Self {
        Self { data, warning: None }
    }
}

fn to_value<T: Serialize>(value: &T) -> AppResult<Value> {
    Ok(serde_json::to_value(value)?)
}

impl ApiHandler {
    pub fn new(state: Arc<AppState>, notifier: WebSocketServer) -> Self {
        Self { state, notifier }
    }

    pub async fn handle(&self, request: ApiRequest) -> ApiResponse {
        let ApiRequest {
            request_id,
            caller_id,
            call,
        } = request;
        let caller = Caller::new(caller_id);

        match self.dispatch(&caller, call).await {
            Ok(outcome) => {
                let mut response = ApiResponse::success(request_id, outcome.data);
                if let Some(warning) = outcome.warning {
                    warn!("Request {} completed with warning: {}", response.request_id, warning);
                    response.warning = Some((&warning).into());
                }
                response
            }
            Err(e) => {
                info!("Request {} failed: {}", request_id, e);
                ApiResponse::failure(request_id, &e)
            }
        }
    }

    async fn dispatch(&self, caller: &Caller, call: ApiCall) -> AppResult<Outcome> {
        let state = &self.state;

        let outcome: Outcome = match call {
            ApiCall::Register {
                username,
                email,
                socials,
            } => to_value(&state.users.register(caller, &username, &email, &socials).await?)?.into(),
            ApiCall::UpdateSocials { socials } => {
                to_value(&state.users.update_socials(caller, &socials).await?)?.into()
            }
            ApiCall::GetProfile { user_id } => to_value(&state.profiles.profile(&user_id).await?)?.into(),
            ApiCall::ListEvents { include_closed } => {
                to_value(&state.matches.list_events(include_closed).await?)?.into()
            }
            ApiCall::CreateEvent { name, description } => {
                to_value(&state.matches.create_event(caller, &name, &description).await?)?.into()
            }
            ApiCall::SetEventStatus { event_id, status } => {
                to_value(&state.matches.set_event_status(caller, event_id, status).await?)?.into()
            }
            ApiCall::DeleteEvent { event_id } => {
                let report = state.matches.delete_event(caller, event_id).await?;
                if report.removed_target() {
                    self.notifier.broadcast_event_deleted(event_id).await;
                }
                Outcome {
                    data: to_value(&report)?,
                    warning: report.partial_failure(),
                }
            }
            ApiCall::ListMatches { event_id } => to_value(&state.matches.list_matches(event_id).await?)?.into(),
            ApiCall::GetMatch { match_id } => to_value(&state.matches.get_match(match_id).await?)?.into(),
            ApiCall::CreateMatch {
                event_id,
                team1,
                team2,
                best_of,
            } => {
                let game = state
                    .matches
                    .create_match(caller, event_id, &team1, &team2, best_of)
                    .await?;
                self.notifier
                    .broadcast_match_created(game.event_id, game.id, game.game_number)
                    .await;
                to_value(&game)?.into()
            }
            ApiCall::LockMatch { match_id } => to_value(&state.matches.lock_match(caller, match_id).await?)?.into(),
            ApiCall::ReopenMatch { match_id } => {
                to_value(&state.matches.reopen_match(caller, match_id).await?)?.into()
            }
            ApiCall::ExcludedChampions { match_id } => {
                to_value(&state.matches.excluded_champions(match_id).await?)?.into()
            }
            ApiCall::ResolveMatch {
                match_id,
                result_draft,
            } => {
                let report = state.matches.resolve_match(caller, match_id, &result_draft).await?;

                self.notifier
                    .broadcast_match_resolved(
                        report.event_id,
                        match_id,
                        report.bets_scored,
                        report.next_game.as_ref().map(|g| g.id),
                    )
                    .await;
                for update in &report.user_updates {
                    self.notifier.broadcast_score_updated(update).await;
                }
                if let Some(next) = &report.next_game {
                    self.notifier
                        .broadcast_match_created(next.event_id, next.id, next.game_number)
                        .await;
                }

                Outcome {
                    data: to_value(&report)?,
                    warning: report.partial_failure(),
                }
            }
            ApiCall::DeleteMatch { match_id } => {
                let event_id = state.store.find_match(match_id).await?.map(|g| g.event_id);
                let report = state.matches.delete_match(caller, match_id).await?;
                if let (Some(event_id), true) = (event_id, report.removed_target()) {
                    self.notifier.broadcast_match_deleted(event_id, match_id).await;
                }
                Outcome {
                    data: to_value(&report)?,
                    warning: report.partial_failure(),
                }
            }
            ApiCall::PlaceBet { match_id, predictions } => {
                to_value(&state.betting.place_bet(caller, match_id, predictions).await?)?.into()
            }
            ApiCall::MyBet { match_id } => to_value(&state.betting.bet_for_match(caller, match_id).await?)?.into(),
            ApiCall::UserBets { user_id } => to_value(&state.betting.bets_for_user(&user_id).await?)?.into(),
            ApiCall::GlobalLeaderboard { limit } => to_value(&state.leaderboard.global(limit).await?)?.into(),
            ApiCall::EventLeaderboard { event_id, limit } => {
                to_value(&state.leaderboard.for_event(event_id, limit).await?)?.into()
            }
            ApiCall::AdjustScore { username, points } => {
                to_value(&state.score_admin.adjust_score(caller, &username, points).await?)?.into()
            }
            ApiCall::ResetScores => {
                let count = state.score_admin.reset_all_scores(caller).await?;
                serde_json::json!({ "usersReset": count }).into()
            }
            ApiCall::Champions => to_value(state.champions.roster().await.as_ref())?.into(),
        };

        Ok(outcome)
    }
}
