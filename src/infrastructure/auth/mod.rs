//! Authentication
//!
//! - [`provider`] - the identity provider seam and its error type
//! - [`google`] - Google consent (PKCE + loopback redirect) and profile lookup
//! - [`callback`] - the loopback redirect listener
//! - [`service`] - sign-in/sign-out/restore policy and the worker loop

pub mod callback;
pub mod google;
pub mod provider;
pub mod service;

use crate::domain::models::{AppEvent, AuthCommand};
use crate::domain::settings::OAuthSettings;
use crate::infrastructure::storage::{KeyValueStore, SessionStore};
use std::path::PathBuf;
use tokio::sync::mpsc;

pub use google::GoogleProvider;
pub use service::AuthService;

/// Starts the auth worker on its own thread and returns its command sender.
pub fn spawn_worker(
    settings: OAuthSettings,
    storage_path: PathBuf,
    events: mpsc::UnboundedSender<AppEvent>,
) -> anyhow::Result<mpsc::UnboundedSender<AuthCommand>> {
    let provider = GoogleProvider::new(settings)?;
    let service = AuthService::new(provider, SessionStore::new(KeyValueStore::new(storage_path)));
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

    std::thread::Builder::new()
        .name("auth".to_string())
        .spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to create tokio runtime for auth");
            rt.block_on(service.run(cmd_rx, events));
        })?;

    Ok(cmd_tx)
}
