use crate::auth::{self, Caller};
use crate::error::{AppError, AppResult};
use crate::models::{Socials, User};
use crate::store::DraftStore;
use crate::utils::validation::{validate_email, validate_social_handle, validate_username};
use std::sync::Arc;
use tracing::info;

fn clean_socials(socials: &Socials) -> AppResult<Socials> {
    Ok(Socials {
        twitter: validate_social_handle(&socials.twitter, "Twitter")?,
        instagram: validate_social_handle(&socials.instagram, "Instagram")?,
        discord: validate_social_handle(&socials.discord, "Discord")?,
    })
}

/// Service for user profiles
pub struct UserService {
    store: Arc<dyn DraftStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn DraftStore>) -> Self {
        Self { store }
    }

    /// Create the profile for an identity-provider uid
    pub async fn register(
        &self,
        caller: &Caller,
        username: &str,
        email: &str,
        socials: &Socials,
    ) -> AppResult<User> {
        let uid = auth::require_authenticated(caller)?;
        let username = validate_username(username)?;
        let email = validate_email(email)?;
        let socials = clean_socials(socials)?;
        info!("Registering user {} as {}", uid, username);

        if self.store.find_user(uid).await?.is_some() {
            return Err(AppError::BusinessLogic(format!("User {} already registered", uid)));
        }
        if self.store.find_user_by_username(&username).await?.is_some() {
            return Err(AppError::BusinessLogic(format!("Username {} is already taken", username)));
        }

        let mut user = User::new(uid.to_string(), username, email);
        user.socials = socials;
        self.store.insert_user(&user).await?;
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> AppResult<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    pub async fn find_by_username(&self, username: &str) -> AppResult<User> {
        self.store
            .find_user_by_username(username.trim())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", username)))
    }

    /// Replace the caller's social handles
    pub async fn update_socials(&self, caller: &Caller, socials: &Socials) -> AppResult<User> {
        let uid = auth::require_authenticated(caller)?;
        let socials = clean_socials(socials)?;

        self.store.update_user_socials(uid, &socials).await?;
        self.get_user(uid).await
    }
}
