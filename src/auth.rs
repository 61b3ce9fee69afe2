use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::store::DraftStore;

/// Identity of whoever issued a request.
///
/// The identity provider sits upstream; by the time a request reaches the
/// services its `caller_id` is trusted. An empty id means nobody signed in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub id: String,
}

impl Caller {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Reject callers without an identity
pub fn require_authenticated(caller: &Caller) -> AppResult<&str> {
    let id = caller.id.trim();
    if id.is_empty() {
        return Err(AppError::Unauthenticated(
            "The function must be called while authenticated".to_string(),
        ));
    }
    Ok(id)
}

/// Load the caller's own user document and require its admin flag
pub async fn require_admin(store: &dyn DraftStore, caller: &Caller) -> AppResult<User> {
    let id = require_authenticated(caller)?;

    match store.find_user(id).await? {
        Some(user) if user.is_admin => Ok(user),
        _ => Err(AppError::PermissionDenied(
            "Only admins can perform this action".to_string(),
        )),
    }
}
