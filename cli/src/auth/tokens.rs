//! Token types for authentication.

use chrono::{DateTime, Duration, Utc};
use oauth2::basic::BasicTokenResponse;
use oauth2::{ErrorResponse, RequestTokenError, TokenResponse};

/// The two identities graphteams can act as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMode {
    /// The app registration itself (client-credentials grant).
    ServiceIdentity,
    /// A signed-in user (device authorization grant).
    UserDelegated,
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServiceIdentity => write!(f, "service identity"),
            Self::UserDelegated => write!(f, "user delegated"),
        }
    }
}

/// Token set received from the identity platform.
///
/// Lives in process memory only.
#[derive(Debug, Clone)]
pub struct TokenSet {
    /// The access token.
    pub access_token: String,
    /// The refresh token (if provided).
    pub refresh_token: Option<String>,
    /// When the access token expires.
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenSet {
    /// Check if the access token is expired or will expire within 5 minutes.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|exp| exp <= Utc::now() + Duration::minutes(5))
    }

    /// Check if the token can be refreshed.
    #[must_use]
    pub const fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }
}

impl From<&BasicTokenResponse> for TokenSet {
    fn from(response: &BasicTokenResponse) -> Self {
        let expires_at = response
            .expires_in()
            .map(|duration| Utc::now() + Duration::from_std(duration).unwrap_or_default());

        Self {
            access_token: response.access_token().secret().clone(),
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            expires_at,
        }
    }
}

/// Render a token endpoint failure with the server's error code and description.
pub fn describe_token_error<RE, T>(err: &RequestTokenError<RE, T>) -> String
where
    RE: std::error::Error + 'static,
    T: ErrorResponse + std::fmt::Display + 'static,
{
    match err {
        RequestTokenError::ServerResponse(response) => response.to_string(),
        RequestTokenError::Request(e) => format!("request failed: {e}"),
        RequestTokenError::Parse(e, _) => format!("unparseable response: {e}"),
        RequestTokenError::Other(message) => message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_at: Option<DateTime<Utc>>) -> TokenSet {
        TokenSet {
            access_token: "token".to_string(),
            refresh_token: None,
            expires_at,
        }
    }

    #[test]
    fn token_without_expiry_never_expires() {
        assert!(!token(None).is_expired());
    }

    #[test]
    fn token_inside_safety_margin_counts_as_expired() {
        assert!(token(Some(Utc::now() + Duration::minutes(2))).is_expired());
        assert!(!token(Some(Utc::now() + Duration::hours(1))).is_expired());
    }

    #[test]
    fn parses_token_endpoint_response() {
        let response: BasicTokenResponse = serde_json::from_str(
            r#"{"access_token":"abc","token_type":"Bearer","expires_in":3600,"refresh_token":"r1"}"#,
        )
        .unwrap();

        let tokens = TokenSet::from(&response);
        assert_eq!(tokens.access_token, "abc");
        assert!(tokens.can_refresh());
        assert!(!tokens.is_expired());
    }
}
