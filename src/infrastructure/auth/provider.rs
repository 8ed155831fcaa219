use crate::domain::session::{Profile, ProviderTokens};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no OAuth client id configured for {0}")]
    MissingClientId(&'static str),
    #[error("invalid OAuth configuration: {0}")]
    Config(String),
    #[error("could not open the browser: {0}")]
    Browser(String),
    #[error("sign-in was cancelled ({0})")]
    Denied(String),
    #[error("timed out waiting for the browser sign-in")]
    ConsentTimedOut,
    #[error("sign-in response did not match the request")]
    StateMismatch,
    #[error("unexpected redirect: {0}")]
    BadCallback(String),
    #[error("token exchange failed: {0}")]
    Exchange(String),
    #[error("Failed to fetch user info: {0}")]
    ProfileStatus(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The external identity provider: browser consent plus one profile lookup.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Runs the interactive consent flow. May wait a long time for the user.
    async fn request_consent(&self) -> Result<ProviderTokens, AuthError>;

    async fn fetch_profile(&self, access_token: &str) -> Result<Profile, AuthError>;
}
