use serde::{Deserialize, Serialize};

/// Tokens handed back by the identity provider after consent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTokens {
    pub access_token: String,
    pub id_token: Option<String>,
}

/// Subset of the provider's userinfo document we care about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    pub email: String,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// The signed-in user. Stored as camelCase JSON under a single storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl Session {
    pub fn from_profile(tokens: ProviderTokens, profile: Profile) -> Self {
        Self {
            access_token: tokens.access_token,
            id_token: tokens.id_token,
            email: Some(profile.email),
            given_name: profile.given_name,
            photo_url: profile.picture,
        }
    }

    /// Token-only session used when the profile lookup failed.
    pub fn minimal(tokens: ProviderTokens) -> Self {
        Self {
            access_token: tokens.access_token,
            id_token: tokens.id_token,
            email: None,
            given_name: None,
            photo_url: None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.email.is_none() && self.given_name.is_none()
    }

    pub fn is_valid(&self) -> bool {
        !self.access_token.trim().is_empty()
    }

    pub fn display_name(&self) -> &str {
        self.given_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.email.as_deref())
            .unwrap_or("Guest")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> ProviderTokens {
        ProviderTokens {
            access_token: "ya29.token".to_string(),
            id_token: Some("eyJ.id".to_string()),
        }
    }

    #[test]
    fn stored_format_is_camel_case() {
        let session = Session::from_profile(
            tokens(),
            Profile {
                email: "ada@example.com".to_string(),
                given_name: Some("Ada".to_string()),
                picture: Some("https://example.com/a.png".to_string()),
            },
        );

        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["accessToken"], "ya29.token");
        assert_eq!(json["givenName"], "Ada");
        assert_eq!(json["photoUrl"], "https://example.com/a.png");
    }

    #[test]
    fn display_name_falls_back_to_email_then_guest() {
        let mut session = Session::minimal(tokens());
        assert!(session.is_degraded());
        assert_eq!(session.display_name(), "Guest");

        session.email = Some("ada@example.com".to_string());
        assert_eq!(session.display_name(), "ada@example.com");

        session.given_name = Some("Ada".to_string());
        assert_eq!(session.display_name(), "Ada");
    }

    #[test]
    fn profile_tolerates_missing_optional_fields() {
        let profile: Profile = serde_json::from_str(r#"{"email":"a@b.c","id":"1"}"#).unwrap();
        assert_eq!(profile.given_name, None);
        assert_eq!(profile.picture, None);
    }
}
