use crate::error::{AppError, AppResult};
use crate::services::reversal::ReversalReport;
use crate::services::scoring::ResolutionReport;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub timestamp: i64,
    pub action: String,
    pub actor_id: String,
    pub target_id: Option<String>,
    pub details: serde_json::Value,
}

/// Append-only JSON-lines record of admin actions that move scores
pub struct AuditTrailService {
    log_file: PathBuf,
    file_handle: Arc<Mutex<std::fs::File>>,
}

impl AuditTrailService {
    /// Open (or create) today's audit file in `log_directory`
    pub fn new(log_directory: impl AsRef<Path>) -> AppResult<Self> {
        let log_directory = log_directory.as_ref();
        std::fs::create_dir_all(log_directory)
            .map_err(|e| AppError::Message(format!("Failed to create log directory: {}", e)))?;

        let date = chrono::Utc::now().format("%Y-%m-%d");
        let log_file = log_directory.join(format!("audit_{}.log", date));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .map_err(|e| AppError::Message(format!("Failed to open audit log file: {}", e)))?;

        info!("Audit trail initialized: {:?}", log_file);

        Ok(Self {
            log_file,
            file_handle: Arc::new(Mutex::new(file)),
        })
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Append one entry
    pub async fn log(&self, entry: AuditLogEntry) -> AppResult<()> {
        let json = serde_json::to_string(&entry)?;

        let mut file = self.file_handle.lock().await;
        writeln!(file, "{}", json)
            .map_err(|e| AppError::Message(format!("Failed to write audit log: {}", e)))?;

        file.flush()
            .map_err(|e| AppError::Message(format!("Failed to flush audit log: {}", e)))?;

        Ok(())
    }

    fn entry(action: &str, actor_id: &str, target_id: Option<String>, details: serde_json::Value) -> AuditLogEntry {
        AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            action: action.to_string(),
            actor_id: actor_id.to_string(),
            target_id,
            details,
        }
    }

    /// Log match resolution
    pub async fn log_match_resolved(&self, actor_id: &str, report: &ResolutionReport) -> AppResult<()> {
        let points: i64 = report.user_updates.iter().map(|u| u.points_added).sum();
        let entry = Self::entry(
            "match_resolved",
            actor_id,
            Some(report.match_id.to_string()),
            serde_json::json!({
                "bets_scored": report.bets_scored,
                "users_updated": report.user_updates.len(),
                "points_awarded": points,
                "failed_updates": report.failures.len(),
                "next_game": report.next_game.as_ref().map(|g| g.id.to_string()),
            }),
        );

        self.log(entry).await
    }

    /// Log match deletion
    pub async fn log_match_deleted(&self, actor_id: &str, match_id: Uuid, report: &ReversalReport) -> AppResult<()> {
        let entry = Self::entry(
            "match_deleted",
            actor_id,
            Some(match_id.to_string()),
            serde_json::json!({
                "points_removed": report.points_removed,
                "bets_deleted": report.deleted_bets,
            }),
        );

        self.log(entry).await
    }

    /// Log event deletion
    pub async fn log_event_deleted(&self, actor_id: &str, event_id: Uuid, report: &ReversalReport) -> AppResult<()> {
        let entry = Self::entry(
            "event_deleted",
            actor_id,
            Some(event_id.to_string()),
            serde_json::json!({
                "points_removed": report.points_removed,
                "matches_deleted": report.deleted_matches,
                "bets_deleted": report.deleted_bets,
            }),
        );

        self.log(entry).await
    }

    /// Log a manual score adjustment
    pub async fn log_score_adjusted(
        &self,
        actor_id: &str,
        user_id: &str,
        points: i64,
        new_total: i64,
    ) -> AppResult<()> {
        let entry = Self::entry(
            "score_adjusted",
            actor_id,
            Some(user_id.to_string()),
            serde_json::json!({
                "points": points,
                "new_total": new_total,
            }),
        );

        self.log(entry).await
    }

    /// Log a reset of every user's scores
    pub async fn log_scores_reset(&self, actor_id: &str, users_reset: usize) -> AppResult<()> {
        let entry = Self::entry(
            "scores_reset",
            actor_id,
            None,
            serde_json::json!({ "users_reset": users_reset }),
        );

        self.log(entry).await
    }
}
