use async_trait::async_trait;
use thiserror::Error;

pub mod pushover;

// Re-exports for convenience
pub use pushover::PushoverNotifier;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error(
        "credentials missing: set pushover.api-token and pushover.user-key \
         (or PUSHOVER_API_TOKEN / PUSHOVER_USER_KEY)"
    )]
    MissingCredentials,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rejected by provider: {0}")]
    Rejected(String),
}

/// A push notification channel.
///
/// Implementations deliver one message per call; a returned error means the
/// message may not have reached the user and aborts the whole run.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message. `url` is attached as the notification's link.
    async fn notify(&self, message: &str, title: &str, url: &str) -> Result<(), NotifyError>;
}
