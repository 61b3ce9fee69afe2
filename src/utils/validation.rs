//! Input validation for user-supplied names and handles.
//!
//! Each validator returns the trimmed value on success.

use crate::error::{AppError, AppResult};

fn invalid(msg: impl Into<String>) -> AppError {
    AppError::InvalidArgument(msg.into())
}

fn length_between(value: &str, field: &str, min: usize, max: usize) -> AppResult<()> {
    let len = value.chars().count();
    if len < min {
        return Err(invalid(format!("{} must be at least {} characters", field, min)));
    }
    if len > max {
        return Err(invalid(format!("{} is too long (max {} characters)", field, max)));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> AppResult<String> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(invalid("Username is required"));
    }
    length_between(trimmed, "Username", 3, 20)?;

    let allowed = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';
    if !trimmed.chars().all(allowed) {
        return Err(invalid(
            "Username can only contain letters, numbers, underscores, and hyphens",
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_email(email: &str) -> AppResult<String> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(invalid("Email is required"));
    }

    let well_formed = match trimmed.split_once('@') {
        Some((local, domain)) => {
            let domain_ok = match domain.rsplit_once('.') {
                Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
                None => false,
            };
            !local.is_empty()
                && !domain.contains('@')
                && domain_ok
                && !trimmed.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !well_formed {
        return Err(invalid("Please enter a valid email address"));
    }

    if trimmed.chars().count() > 100 {
        return Err(invalid("Email is too long (max 100 characters)"));
    }
    Ok(trimmed.to_string())
}

/// Social handles are optional; only the length is bounded
pub fn validate_social_handle(handle: &str, platform: &str) -> AppResult<String> {
    let trimmed = handle.trim();
    if trimmed.chars().count() > 50 {
        return Err(invalid(format!(
            "{} username is too long (max 50 characters)",
            platform
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_team_name(name: &str) -> AppResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(invalid("Team name is required"));
    }
    length_between(trimmed, "Team name", 2, 50)?;
    Ok(trimmed.to_string())
}

pub fn validate_event_name(name: &str) -> AppResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(invalid("Event name is required"));
    }
    length_between(trimmed, "Event name", 3, 100)?;
    Ok(trimmed.to_string())
}
