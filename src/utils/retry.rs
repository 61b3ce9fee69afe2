use crate::config::RetryConfig;
use crate::error::AppResult;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Delay before retrying after the given zero-based attempt
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    config.initial_delay() * 2u32.saturating_pow(attempt)
}

/// Run `op` until it succeeds, fails with a non-transient error, or
/// `max_attempts` is used up. Waits `initial_delay * 2^attempt` in between.
pub async fn retry_with_backoff<T, F, Fut>(config: &RetryConfig, label: &str, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt + 1 < max_attempts => {
                let delay = backoff_delay(config, attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    label,
                    attempt + 1,
                    max_attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
