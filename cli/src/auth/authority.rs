//! Microsoft identity platform endpoints for one tenant.

use oauth2::basic::BasicClient;
use oauth2::{AuthType, AuthUrl, ClientId, ClientSecret, DeviceAuthorizationUrl, TokenUrl};
use url::Url;

use crate::error::{GraphTeamsError, Result};

/// OAuth endpoints of a tenant (`{authority}/{tenant}/oauth2/v2.0/...`).
#[derive(Debug, Clone)]
pub struct Authority {
    /// Authorization URL.
    pub auth_url: AuthUrl,
    /// Token URL.
    pub token_url: TokenUrl,
    /// Device authorization URL for device flow.
    pub device_auth_url: DeviceAuthorizationUrl,
}

impl Authority {
    /// Resolve the endpoints of `tenant_id` under `authority_url`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphTeamsError::Config`] if the resulting URLs are invalid.
    pub fn for_tenant(authority_url: &Url, tenant_id: &str) -> Result<Self> {
        let endpoint = |name: &str| -> Result<String> {
            authority_url
                .join(&format!("{tenant_id}/oauth2/v2.0/{name}"))
                .map(String::from)
                .map_err(|e| GraphTeamsError::Config(format!("Invalid {name} URL: {e}")))
        };

        Ok(Self {
            auth_url: AuthUrl::new(endpoint("authorize")?)
                .map_err(|e| GraphTeamsError::Config(format!("Invalid auth URL: {e}")))?,
            token_url: TokenUrl::new(endpoint("token")?)
                .map_err(|e| GraphTeamsError::Config(format!("Invalid token URL: {e}")))?,
            device_auth_url: DeviceAuthorizationUrl::new(endpoint("devicecode")?).map_err(
                |e| GraphTeamsError::Config(format!("Invalid device auth URL: {e}")),
            )?,
        })
    }

    /// Build an OAuth2 client for this tenant.
    ///
    /// Confidential clients send their secret in the request body, which is
    /// what the identity platform expects.
    #[must_use]
    pub fn build_client(&self, client_id: &str, client_secret: Option<&str>) -> BasicClient {
        let client = BasicClient::new(
            ClientId::new(client_id.to_string()),
            client_secret.map(|s| ClientSecret::new(s.to_string())),
            self.auth_url.clone(),
            Some(self.token_url.clone()),
        )
        .set_device_authorization_url(self.device_auth_url.clone());

        if client_secret.is_some() {
            client.set_auth_type(AuthType::RequestBody)
        } else {
            client
        }
    }
}
