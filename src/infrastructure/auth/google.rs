//! Google sign-in
//!
//! Authorization code flow with PKCE and a loopback redirect, which is what
//! Google expects from installed apps. The code exchange itself is done by
//! `oauth2`; we only keep the access token and the optional `id_token`.

use super::callback;
use super::provider::{AuthError, IdentityProvider};
use crate::domain::session::{Profile, ProviderTokens};
use crate::domain::settings::OAuthSettings;
use async_trait::async_trait;
use oauth2::basic::{
    BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
    BasicTokenType,
};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, ExtraTokenFields,
    PkceCodeChallenge, RedirectUrl, Scope, StandardRevocableToken, StandardTokenResponse,
    TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::process::Command;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Google returns an OpenID `id_token` next to the access token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdTokenFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl ExtraTokenFields for IdTokenFields {}

type GoogleTokenResponse = StandardTokenResponse<IdTokenFields, BasicTokenType>;

type GoogleClient = oauth2::Client<
    BasicErrorResponse,
    GoogleTokenResponse,
    BasicTokenType,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
>;

pub struct GoogleProvider {
    settings: OAuthSettings,
    http: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(settings: OAuthSettings) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("esp32_remote/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { settings, http })
    }

    fn client(&self, redirect: RedirectUrl) -> Result<GoogleClient, AuthError> {
        let os = std::env::consts::OS;
        let client_id = self
            .settings
            .client_ids
            .for_os(os)
            .ok_or(AuthError::MissingClientId(os))?;

        let auth_url = AuthUrl::new(self.settings.auth_url.clone())
            .map_err(|e| AuthError::Config(format!("auth_url: {e}")))?;
        let token_url = TokenUrl::new(self.settings.token_url.clone())
            .map_err(|e| AuthError::Config(format!("token_url: {e}")))?;

        Ok(GoogleClient::new(
            ClientId::new(client_id.to_string()),
            self.settings.client_secret.clone().map(ClientSecret::new),
            auth_url,
            Some(token_url),
        )
        .set_redirect_uri(redirect))
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    async fn request_consent(&self) -> Result<ProviderTokens, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", self.settings.redirect_port)).await?;
        let port = listener.local_addr()?.port();
        let redirect = RedirectUrl::new(format!("http://127.0.0.1:{port}"))
            .map_err(|e| AuthError::Config(e.to_string()))?;
        let client = self.client(redirect)?;

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (authorize_url, csrf_state) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.settings.scopes.iter().cloned().map(Scope::new))
            .set_pkce_challenge(pkce_challenge)
            .url();

        info!(port, "Opening browser for Google consent");
        open_in_browser(authorize_url.as_str())?;

        let wait = Duration::from_secs(self.settings.consent_timeout_secs);
        let params = tokio::time::timeout(wait, callback::wait_for_callback(&listener))
            .await
            .map_err(|_| AuthError::ConsentTimedOut)??;
        let code = params.into_code(csrf_state.secret())?;

        let token = client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(async_http_client)
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        if token.extra_fields().id_token.is_none() {
            warn!("Token response carried no id_token");
        }

        Ok(ProviderTokens {
            access_token: token.access_token().secret().clone(),
            id_token: token.extra_fields().id_token.clone(),
        })
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<Profile, AuthError> {
        let response = self
            .http
            .get(&self.settings.profile_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::ProfileStatus(status.to_string()));
        }

        Ok(response.json::<Profile>().await?)
    }
}

/// Hands the URL to the desktop's default browser.
fn open_in_browser(url: &str) -> Result<(), AuthError> {
    let program = if cfg!(target_os = "windows") {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };

    Command::new(program)
        .arg(url)
        .spawn()
        .map(|_| ())
        .map_err(|e| AuthError::Browser(format!("{program}: {e}")))
}
