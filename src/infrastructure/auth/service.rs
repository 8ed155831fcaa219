//! Auth session service
//!
//! Owns the identity provider and the session store. The worker loop turns
//! every outcome into an [`AuthEvent`] and, on failure, a modal alert.

use super::provider::{AuthError, IdentityProvider};
use crate::domain::models::{AppEvent, AuthCommand, AuthEvent, StatusMessage};
use crate::domain::session::Session;
use crate::infrastructure::storage::{SessionStore, StorageError};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInOutcome {
    pub session: Session,
    /// Set when the user is signed in but something short of failure went wrong.
    pub warning: Option<String>,
}

pub struct AuthService<P> {
    provider: P,
    sessions: SessionStore,
}

impl<P: IdentityProvider> AuthService<P> {
    pub fn new(provider: P, sessions: SessionStore) -> Self {
        Self { provider, sessions }
    }

    pub async fn restore(&self) -> Result<Option<Session>, StorageError> {
        self.sessions.load().await
    }

    /// Consent failures are errors. A failed profile lookup still signs the
    /// user in with a token-only session, which is not persisted.
    pub async fn sign_in(&self) -> Result<SignInOutcome, AuthError> {
        let tokens = self.provider.request_consent().await?;

        match self.provider.fetch_profile(&tokens.access_token).await {
            Ok(profile) => {
                let session = Session::from_profile(tokens, profile);
                let warning = match self.sessions.save(&session).await {
                    Ok(()) => None,
                    Err(e) => {
                        error!("Failed to persist session: {}", e);
                        Some(format!("Could not save session: {e}"))
                    }
                };
                info!(email = ?session.email, "User logged in");
                Ok(SignInOutcome { session, warning })
            }
            Err(e) => {
                warn!("Failed to fetch user info: {}", e);
                Ok(SignInOutcome {
                    session: Session::minimal(tokens),
                    warning: Some(format!("Error fetching user info: {e}")),
                })
            }
        }
    }

    pub async fn sign_out(&self) -> Result<(), StorageError> {
        self.sessions.clear().await?;
        info!("User signed out");
        Ok(())
    }

    async fn handle(&self, command: AuthCommand, events: &mpsc::UnboundedSender<AppEvent>) {
        let send_alert = |message: StatusMessage| {
            let _ = events.send(AppEvent::Alert(message));
        };

        let event = match command {
            AuthCommand::Restore => match self.restore().await {
                Ok(session) => AuthEvent::Restored(session),
                Err(e) => {
                    error!("Failed to load user from storage: {}", e);
                    send_alert(StatusMessage::error(format!("Error loading session: {e}")));
                    AuthEvent::Restored(None)
                }
            },
            AuthCommand::SignIn => match self.sign_in().await {
                Ok(outcome) => {
                    if let Some(warning) = outcome.warning {
                        send_alert(StatusMessage::warning(warning));
                    }
                    AuthEvent::SignedIn(outcome.session)
                }
                Err(e) => {
                    error!("Google sign-in failed: {}", e);
                    send_alert(StatusMessage::error(format!("Authentication Error: {e}")));
                    AuthEvent::SignInFailed
                }
            },
            AuthCommand::SignOut => match self.sign_out().await {
                Ok(()) => AuthEvent::SignedOut,
                Err(e) => {
                    error!("Failed to sign out: {}", e);
                    send_alert(StatusMessage::error(format!("Error signing out: {e}")));
                    AuthEvent::SignOutFailed
                }
            },
        };

        let _ = events.send(AppEvent::Auth(event));
    }

    /// Processes commands until the UI drops its sender.
    pub async fn run(
        self,
        mut commands: mpsc::UnboundedReceiver<AuthCommand>,
        events: mpsc::UnboundedSender<AppEvent>,
    ) {
        while let Some(command) = commands.recv().await {
            self.handle(command, &events).await;
        }
        info!("Auth worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::MessageSeverity;
    use crate::domain::session::{Profile, ProviderTokens};
    use crate::infrastructure::storage::tests::scratch_store;
    use crate::infrastructure::storage::{KeyValueStore, SESSION_KEY};
    use async_trait::async_trait;
    use std::path::PathBuf;

    struct FakeProvider {
        consent_ok: bool,
        profile_ok: bool,
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        async fn request_consent(&self) -> Result<ProviderTokens, AuthError> {
            if self.consent_ok {
                Ok(ProviderTokens {
                    access_token: "ya29.token".to_string(),
                    id_token: Some("eyJ.id".to_string()),
                })
            } else {
                Err(AuthError::Denied("access_denied".to_string()))
            }
        }

        async fn fetch_profile(&self, access_token: &str) -> Result<Profile, AuthError> {
            assert_eq!(access_token, "ya29.token");
            if self.profile_ok {
                Ok(Profile {
                    email: "ada@example.com".to_string(),
                    given_name: Some("Ada".to_string()),
                    picture: None,
                })
            } else {
                Err(AuthError::ProfileStatus("401 Unauthorized".to_string()))
            }
        }
    }

    fn service(consent_ok: bool, profile_ok: bool) -> (AuthService<FakeProvider>, PathBuf) {
        let kv = scratch_store();
        let path = kv.path().to_path_buf();
        let service = AuthService::new(
            FakeProvider {
                consent_ok,
                profile_ok,
            },
            SessionStore::new(kv),
        );
        (service, path)
    }

    fn stored(path: PathBuf) -> SessionStore {
        SessionStore::new(KeyValueStore::new(path))
    }

    #[tokio::test]
    async fn successful_sign_in_is_persisted() {
        let (service, path) = service(true, true);
        let outcome = service.sign_in().await.unwrap();

        assert_eq!(outcome.warning, None);
        assert_eq!(outcome.session.display_name(), "Ada");
        assert_eq!(stored(path).load().await.unwrap(), Some(outcome.session));
    }

    #[tokio::test]
    async fn profile_failure_degrades_to_token_only_session() {
        let (service, path) = service(true, false);
        let outcome = service.sign_in().await.unwrap();

        assert!(outcome.session.is_degraded());
        assert_eq!(outcome.session.access_token, "ya29.token");
        assert_eq!(
            outcome.warning.as_deref(),
            Some("Error fetching user info: Failed to fetch user info: 401 Unauthorized")
        );
        assert_eq!(stored(path).load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn cancelled_consent_leaves_user_signed_out() {
        let (service, path) = service(false, true);
        let (tx, mut rx) = mpsc::unbounded_channel();

        service.handle(AuthCommand::SignIn, &tx).await;

        match rx.recv().await {
            Some(AppEvent::Alert(alert)) => {
                assert_eq!(alert.severity, MessageSeverity::Error);
                assert!(alert.message.starts_with("Authentication Error:"));
            }
            other => panic!("expected alert, got {other:?}"),
        }
        assert!(matches!(
            rx.recv().await,
            Some(AppEvent::Auth(AuthEvent::SignInFailed))
        ));
        assert_eq!(stored(path).load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_stored_session_restores_as_signed_out() {
        let (service, path) = service(true, true);
        KeyValueStore::new(path)
            .set_item(SESSION_KEY, "not json".to_string())
            .await
            .unwrap();

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (tx, mut rx) = mpsc::unbounded_channel();
        cmd_tx.send(AuthCommand::Restore).unwrap();
        drop(cmd_tx);
        service.run(cmd_rx, tx).await;

        assert!(matches!(rx.recv().await, Some(AppEvent::Alert(_))));
        assert!(matches!(
            rx.recv().await,
            Some(AppEvent::Auth(AuthEvent::Restored(None)))
        ));
    }

    #[tokio::test]
    async fn missing_session_restores_silently() {
        let (service, _path) = service(true, true);
        let (tx, mut rx) = mpsc::unbounded_channel();

        service.handle(AuthCommand::Restore, &tx).await;
        assert!(matches!(
            rx.recv().await,
            Some(AppEvent::Auth(AuthEvent::Restored(None)))
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn sign_out_removes_the_record() {
        let (service, path) = service(true, true);
        service.sign_in().await.unwrap();
        service.sign_out().await.unwrap();
        assert_eq!(stored(path).load().await.unwrap(), None);
    }
}
