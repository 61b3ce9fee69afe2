use crate::auth::{self, Caller};
use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::services::audit::AuditTrailService;
use crate::store::{DraftStore, WriteOp};
use std::sync::Arc;
use tracing::{info, warn};

/// Manual corrections to user totals
pub struct ScoreAdminService {
    store: Arc<dyn DraftStore>,
    audit: Option<Arc<AuditTrailService>>,
}

impl ScoreAdminService {
    pub fn new(store: Arc<dyn DraftStore>) -> Self {
        Self { store, audit: None }
    }

    pub fn with_audit(mut self, audit: Arc<AuditTrailService>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Add `points` (negative to subtract) to a user's total. Event scores are
    /// left alone and the total never drops below zero.
    pub async fn adjust_score(&self, caller: &Caller, username: &str, points: i64) -> AppResult<User> {
        let admin = auth::require_admin(self.store.as_ref(), caller).await?;
        if points == 0 {
            return Err(AppError::InvalidArgument("Points must be a non-zero number".to_string()));
        }

        let target = self
            .store
            .find_user_by_username(username.trim())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", username)))?;

        let updated = self.store.adjust_total_score(&target.id, points).await?;
        info!(
            "Admin {} adjusted {} by {} points (total now {})",
            admin.id, updated.username, points, updated.total_score
        );

        if let Some(audit) = &self.audit {
            if let Err(e) = audit
                .log_score_adjusted(&admin.id, &updated.id, points, updated.total_score)
                .await
            {
                warn!("Failed to audit score adjustment: {}", e);
            }
        }
        Ok(updated)
    }

    /// Zero every user's total and event scores in one batch
    pub async fn reset_all_scores(&self, caller: &Caller) -> AppResult<usize> {
        let admin = auth::require_admin(self.store.as_ref(), caller).await?;

        let users = self.store.list_users().await?;
        let ops: Vec<WriteOp> = users
            .iter()
            .map(|u| WriteOp::ResetUserScores { user_id: u.id.clone() })
            .collect();
        let count = ops.len();

        self.store.commit_batch(ops).await?;
        info!("Admin {} reset scores for {} users", admin.id, count);

        if let Some(audit) = &self.audit {
            if let Err(e) = audit.log_scores_reset(&admin.id, count).await {
                warn!("Failed to audit score reset: {}", e);
            }
        }
        Ok(count)
    }
}
