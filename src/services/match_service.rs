use crate::auth::{self, Caller};
use crate::error::{AppError, AppResult};
use crate::models::{BestOf, Draft, Event, EventStatus, Match, MatchStatus};
use crate::services::audit::AuditTrailService;
use crate::services::reversal::{ReversalEngine, ReversalReport};
use crate::services::scoring::{ResolutionReport, ScoringEngine};
use crate::services::series::{validate_draft, SeriesExclusionResolver};
use crate::store::DraftStore;
use crate::utils::validation::{validate_event_name, validate_team_name};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Admin-facing management of events and matches
pub struct MatchService {
    store: Arc<dyn DraftStore>,
    scoring: Arc<ScoringEngine>,
    reversal: Arc<ReversalEngine>,
    series: Arc<SeriesExclusionResolver>,
    audit: Option<Arc<AuditTrailService>>,
}

impl MatchService {
    pub fn new(
        store: Arc<dyn DraftStore>,
        scoring: Arc<ScoringEngine>,
        reversal: Arc<ReversalEngine>,
        series: Arc<SeriesExclusionResolver>,
    ) -> Self {
        Self {
            store,
            scoring,
            reversal,
            series,
            audit: None,
        }
    }

    /// Record score-changing actions in the audit trail
    pub fn with_audit(mut self, audit: Arc<AuditTrailService>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Create a new event
    pub async fn create_event(&self, caller: &Caller, name: &str, description: &str) -> AppResult<Event> {
        auth::require_admin(self.store.as_ref(), caller).await?;
        let name = validate_event_name(name)?;
        info!("Creating event: name={}", name);

        let event = Event::new(name, description.trim().to_string());
        self.store.insert_event(&event).await?;
        Ok(event)
    }

    /// Open or close an event
    pub async fn set_event_status(&self, caller: &Caller, event_id: Uuid, status: EventStatus) -> AppResult<Event> {
        auth::require_admin(self.store.as_ref(), caller).await?;
        info!("Setting event {} status to {}", event_id, status.as_str());

        self.store.update_event_status(event_id, status).await?;
        self.get_event(event_id).await
    }

    pub async fn get_event(&self, event_id: Uuid) -> AppResult<Event> {
        self.store
            .find_event(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))
    }

    /// Events newest first, closed ones only on request
    pub async fn list_events(&self, include_closed: bool) -> AppResult<Vec<Event>> {
        let events = self.store.list_events().await?;
        Ok(events
            .into_iter()
            .filter(|e| include_closed || e.is_active())
            .collect())
    }

    pub async fn get_match(&self, match_id: Uuid) -> AppResult<Match> {
        self.store
            .find_match(match_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Match {} not found", match_id)))
    }

    /// Matches of one event, newest first
    pub async fn list_matches(&self, event_id: Uuid) -> AppResult<Vec<Match>> {
        Ok(self.store.find_matches_by_event(event_id).await?)
    }

    /// Create game 1 of a new series
    pub async fn create_match(
        &self,
        caller: &Caller,
        event_id: Uuid,
        team1: &str,
        team2: &str,
        best_of: BestOf,
    ) -> AppResult<Match> {
        auth::require_admin(self.store.as_ref(), caller).await?;
        let team1 = validate_team_name(team1)?;
        let team2 = validate_team_name(team2)?;
        info!("Creating match: event={}, {} vs {} ({})", event_id, team1, team2, best_of.as_str());

        let event = self.get_event(event_id).await?;
        if !event.is_active() {
            return Err(AppError::BusinessLogic(format!("Event {} is closed", event.name)));
        }

        let game = Match::new_series(event_id, team1, team2, best_of);
        self.store.insert_match(&game).await?;
        Ok(game)
    }

    /// Stop accepting bets
    pub async fn lock_match(&self, caller: &Caller, match_id: Uuid) -> AppResult<Match> {
        self.transition(caller, match_id, MatchStatus::Locked).await
    }

    /// Accept bets again. Scores from an earlier resolution stay in place.
    pub async fn reopen_match(&self, caller: &Caller, match_id: Uuid) -> AppResult<Match> {
        self.transition(caller, match_id, MatchStatus::Open).await
    }

    async fn transition(&self, caller: &Caller, match_id: Uuid, next: MatchStatus) -> AppResult<Match> {
        auth::require_admin(self.store.as_ref(), caller).await?;
        let mut game = self.get_match(match_id).await?;

        if !game.status.can_transition_to(next) {
            return Err(AppError::BusinessLogic(format!(
                "Cannot move match from {} to {}",
                game.status.as_str(),
                next.as_str()
            )));
        }

        info!("Match {} {} -> {}", match_id, game.status.as_str(), next.as_str());
        self.store.update_match_status(match_id, next).await?;
        game.status = next;
        Ok(game)
    }

    /// Champions used by earlier games of the match's series
    pub async fn excluded_champions(&self, match_id: Uuid) -> AppResult<BTreeSet<String>> {
        let game = self.get_match(match_id).await?;
        Ok(self.series.excluded_for_match(&game).await)
    }

    /// Enter the final draft of a locked match and score it
    pub async fn resolve_match(
        &self,
        caller: &Caller,
        match_id: Uuid,
        result_draft: &Draft,
    ) -> AppResult<ResolutionReport> {
        let admin = auth::require_admin(self.store.as_ref(), caller).await?;
        let game = self.get_match(match_id).await?;

        if game.status != MatchStatus::Locked {
            return Err(AppError::BusinessLogic(format!(
                "Match must be locked before it is resolved (currently {})",
                game.status.as_str()
            )));
        }

        let excluded = self.series.excluded_for_match(&game).await;
        validate_draft(result_draft, &excluded, true)?;

        let report = self.scoring.resolve_match(&game, result_draft).await?;

        if let Some(audit) = &self.audit {
            if let Err(e) = audit.log_match_resolved(&admin.id, &report).await {
                warn!("Failed to audit resolution of match {}: {}", match_id, e);
            }
        }
        Ok(report)
    }

    /// Delete a match and take back the points it granted
    pub async fn delete_match(&self, caller: &Caller, match_id: Uuid) -> AppResult<ReversalReport> {
        let admin = auth::require_admin(self.store.as_ref(), caller).await?;
        let report = self.reversal.reverse_match(match_id).await?;

        if let Some(audit) = &self.audit {
            if let Err(e) = audit.log_match_deleted(&admin.id, match_id, &report).await {
                warn!("Failed to audit deletion of match {}: {}", match_id, e);
            }
        }
        Ok(report)
    }

    /// Delete an event with everything under it and take back its points
    pub async fn delete_event(&self, caller: &Caller, event_id: Uuid) -> AppResult<ReversalReport> {
        let admin = auth::require_admin(self.store.as_ref(), caller).await?;
        let report = self.reversal.reverse_event(event_id).await?;

        if let Some(audit) = &self.audit {
            if let Err(e) = audit.log_event_deleted(&admin.id, event_id, &report).await {
                warn!("Failed to audit deletion of event {}: {}", event_id, e);
            }
        }
        Ok(report)
    }
}
