pub mod retry;
pub mod validation;

pub use retry::retry_with_backoff;
