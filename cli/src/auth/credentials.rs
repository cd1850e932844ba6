//! Credentials for the two authentication modes.
//!
//! - [`ServiceIdentityCredential`] - client-credentials grant, no user involved
//! - [`UserDelegatedCredential`] - device authorization grant for a signed-in user
//!
//! Both keep their last token in memory and hand it out until it nears expiry.

use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::RefreshToken;
use tokio::sync::Mutex;

use crate::auth::authority::Authority;
use crate::auth::device_flow::{poll_for_token, start_device_flow, VerificationCallback};
use crate::auth::scopes::ScopeSet;
use crate::auth::tokens::{describe_token_error, TokenSet};
use crate::error::{GraphTeamsError, Result};

/// Something that can produce access tokens for a scope set.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Returns a token valid for at least the next few minutes.
    ///
    /// # Errors
    ///
    /// Returns an authentication error if the identity platform refuses the exchange.
    async fn get_token(&self, scopes: &ScopeSet) -> Result<TokenSet>;
}

/// App-only credential backed by a client secret.
pub struct ServiceIdentityCredential {
    tenant_id: String,
    client: BasicClient,
    cache: Mutex<Option<TokenSet>>,
}

#[async_trait]
impl TokenCredential for ServiceIdentityCredential {
    async fn get_token(&self, scopes: &ScopeSet) -> Result<TokenSet> {
        let mut cache = self.cache.lock().await;
        if let Some(tokens) = cache.as_ref().filter(|t| !t.is_expired()) {
            return Ok(tokens.clone());
        }

        tracing::debug!(tenant = %self.tenant_id, "Requesting app-only token");

        let mut request = self.client.exchange_client_credentials();
        for scope in scopes.to_vec() {
            request = request.add_scope(scope);
        }

        let response = request
            .request_async(async_http_client)
            .await
            .map_err(|e| {
                GraphTeamsError::AuthenticationFailed(format!(
                    "Client credentials exchange failed: {}",
                    describe_token_error(&e)
                ))
            })?;

        let tokens = TokenSet::from(&response);
        *cache = Some(tokens.clone());
        Ok(tokens)
    }
}

/// Interactive credential that signs a user in with a device code.
///
/// The verification callback fires on the first token request only; later
/// requests reuse the cached token or renew it with the refresh token.
pub struct UserDelegatedCredential {
    tenant_id: String,
    client: BasicClient,
    on_verification_prompt: VerificationCallback,
    cache: Mutex<Option<TokenSet>>,
}

impl UserDelegatedCredential {
    async fn refresh(&self, current: &TokenSet, scopes: &ScopeSet) -> Result<TokenSet> {
        let refresh_token = match current.refresh_token.as_deref() {
            Some(token) if current.can_refresh() => RefreshToken::new(token.to_string()),
            _ => return Err(GraphTeamsError::SessionExpired),
        };

        let mut request = self.client.exchange_refresh_token(&refresh_token);
        for scope in scopes.to_vec() {
            request = request.add_scope(scope);
        }

        let response = request.request_async(async_http_client).await.map_err(|e| {
            tracing::warn!("Refreshing the delegated token failed: {}", describe_token_error(&e));
            GraphTeamsError::SessionExpired
        })?;

        let mut tokens = TokenSet::from(&response);
        if tokens.refresh_token.is_none() {
            tokens.refresh_token.clone_from(&current.refresh_token);
        }
        Ok(tokens)
    }
}

#[async_trait]
impl TokenCredential for UserDelegatedCredential {
    async fn get_token(&self, scopes: &ScopeSet) -> Result<TokenSet> {
        let mut cache = self.cache.lock().await;

        if let Some(current) = cache.clone() {
            if !current.is_expired() {
                return Ok(current);
            }
            tracing::debug!("Delegated token expired, refreshing");
            let tokens = self.refresh(&current, scopes).await?;
            *cache = Some(tokens.clone());
            return Ok(tokens);
        }

        tracing::info!(tenant = %self.tenant_id, "Starting device code sign-in");
        let device_auth = start_device_flow(&self.client, scopes).await?;
        (self.on_verification_prompt)(&device_auth.prompt);

        tracing::info!("Waiting for device code sign-in to complete");
        let tokens = poll_for_token(&self.client, &device_auth).await?;
        tracing::info!("Device code sign-in completed");

        *cache = Some(tokens.clone());
        Ok(tokens)
    }
}

/// A credential of either mode.
pub enum Credential {
    /// Client-credentials grant.
    ServiceIdentity(ServiceIdentityCredential),
    /// Device authorization grant.
    UserDelegated(UserDelegatedCredential),
}

#[async_trait]
impl TokenCredential for Credential {
    async fn get_token(&self, scopes: &ScopeSet) -> Result<TokenSet> {
        match self {
            Self::ServiceIdentity(credential) => credential.get_token(scopes).await,
            Self::UserDelegated(credential) => credential.get_token(scopes).await,
        }
    }
}

/// Build the app-only credential. Performs no I/O.
///
/// Callers validate that the identifiers are non-empty beforehand.
#[must_use]
pub fn create_service_identity_credential(
    authority: &Authority,
    tenant_id: &str,
    client_id: &str,
    client_secret: &str,
) -> Credential {
    Credential::ServiceIdentity(ServiceIdentityCredential {
        tenant_id: tenant_id.to_string(),
        client: authority.build_client(client_id, Some(client_secret)),
        cache: Mutex::new(None),
    })
}

/// Build the device-code credential. Performs no I/O.
///
/// `on_verification_prompt` runs during the first token request, not here.
#[must_use]
pub fn create_user_delegated_credential(
    authority: &Authority,
    tenant_id: &str,
    client_id: &str,
    on_verification_prompt: VerificationCallback,
) -> Credential {
    Credential::UserDelegated(UserDelegatedCredential {
        tenant_id: tenant_id.to_string(),
        client: authority.build_client(client_id, None),
        on_verification_prompt,
        cache: Mutex::new(None),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn authority_for(server: &MockServer) -> Authority {
        let base = Url::parse(&format!("{}/", server.uri())).unwrap();
        Authority::for_tenant(&base, "tenant").unwrap()
    }

    fn token_body(access_token: &str) -> serde_json::Value {
        json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "refresh"
        })
    }

    #[tokio::test]
    async fn service_identity_token_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_secret=secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("app-token")))
            .expect(1)
            .mount(&server)
            .await;

        let authority = authority_for(&server).await;
        let credential =
            create_service_identity_credential(&authority, "tenant", "client", "secret");

        let scopes = ScopeSet::service_identity();
        let first = credential.get_token(&scopes).await.unwrap();
        let second = credential.get_token(&scopes).await.unwrap();

        assert_eq!(first.access_token, "app-token");
        assert_eq!(second.access_token, "app-token");
    }

    #[tokio::test]
    async fn rejected_secret_is_an_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_client",
                "error_description": "AADSTS7000215: Invalid client secret provided."
            })))
            .mount(&server)
            .await;

        let authority = authority_for(&server).await;
        let credential =
            create_service_identity_credential(&authority, "tenant", "client", "wrong");

        let err = credential
            .get_token(&ScopeSet::service_identity())
            .await
            .unwrap_err();
        match err {
            GraphTeamsError::AuthenticationFailed(message) => {
                assert!(message.contains("invalid_client"), "{message}");
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn device_code_prompt_fires_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/devicecode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "device_code": "device",
                "user_code": "ABCD-EFGH",
                "verification_uri": "https://microsoft.com/devicelogin",
                "expires_in": 900,
                "interval": 1
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .and(body_string_contains("device_code=device"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("user-token")))
            .expect(1)
            .mount(&server)
            .await;

        let prompts = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&prompts);
        let callback: VerificationCallback = Arc::new(move |prompt| {
            assert_eq!(prompt.user_code, "ABCD-EFGH");
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let authority = authority_for(&server).await;
        let credential = create_user_delegated_credential(&authority, "tenant", "client", callback);

        let scopes = ScopeSet::user_delegated();
        let first = credential.get_token(&scopes).await.unwrap();
        let second = credential.get_token(&scopes).await.unwrap();

        assert_eq!(first.access_token, "user-token");
        assert_eq!(second.access_token, "user-token");
        assert_eq!(prompts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn declined_device_code_surfaces_access_denied() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/devicecode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "device_code": "device",
                "user_code": "ABCD-EFGH",
                "verification_uri": "https://microsoft.com/devicelogin",
                "expires_in": 900,
                "interval": 1
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "authorization_declined",
                "error_description": "The end user denied the authorization request."
            })))
            .mount(&server)
            .await;

        let authority = authority_for(&server).await;
        let callback: VerificationCallback = Arc::new(|_| {});
        let credential = create_user_delegated_credential(&authority, "tenant", "client", callback);

        let err = credential
            .get_token(&ScopeSet::user_delegated())
            .await
            .unwrap_err();
        assert!(matches!(err, GraphTeamsError::AccessDenied));
    }

    async fn mount_short_lived_sign_in(server: &MockServer, refresh_token: Option<&str>) {
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/devicecode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "device_code": "device",
                "user_code": "ABCD-EFGH",
                "verification_uri": "https://microsoft.com/devicelogin",
                "expires_in": 900,
                "interval": 1
            })))
            .expect(1)
            .mount(server)
            .await;

        // Inside the expiry margin, so the next request must renew it.
        let mut body = json!({
            "access_token": "short-lived",
            "token_type": "Bearer",
            "expires_in": 60
        });
        if let Some(refresh_token) = refresh_token {
            body["refresh_token"] = json!(refresh_token);
        }
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .and(body_string_contains("device_code=device"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn expired_delegated_token_is_renewed_with_refresh_token() {
        let server = MockServer::start().await;
        mount_short_lived_sign_in(&server, Some("refresh")).await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "renewed",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let authority = authority_for(&server).await;
        let callback: VerificationCallback = Arc::new(|_| {});
        let credential = create_user_delegated_credential(&authority, "tenant", "client", callback);

        let scopes = ScopeSet::user_delegated();
        assert_eq!(credential.get_token(&scopes).await.unwrap().access_token, "short-lived");

        let renewed = credential.get_token(&scopes).await.unwrap();
        assert_eq!(renewed.access_token, "renewed");
        assert_eq!(renewed.refresh_token.as_deref(), Some("refresh"));
    }

    #[tokio::test]
    async fn expired_token_without_refresh_token_needs_a_new_sign_in() {
        let server = MockServer::start().await;
        mount_short_lived_sign_in(&server, None).await;

        let authority = authority_for(&server).await;
        let callback: VerificationCallback = Arc::new(|_| {});
        let credential = create_user_delegated_credential(&authority, "tenant", "client", callback);

        let scopes = ScopeSet::user_delegated();
        credential.get_token(&scopes).await.unwrap();

        let err = credential.get_token(&scopes).await.unwrap_err();
        assert!(matches!(err, GraphTeamsError::SessionExpired));
        assert!(err.requires_reauth());
    }
}
