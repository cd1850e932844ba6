//! Binds a credential to the scopes of one flow and produces `Authorization` headers.

use std::sync::Arc;

use http::HeaderValue;

use crate::auth::credentials::TokenCredential;
use crate::auth::scopes::ScopeSet;
use crate::error::{GraphTeamsError, Result};

/// Authorization header supplier used by the Graph HTTP client.
///
/// The scope set is fixed at construction.
pub struct TokenAuthProvider {
    credential: Arc<dyn TokenCredential>,
    scopes: ScopeSet,
}

impl TokenAuthProvider {
    /// Wrap `credential` with the scopes it should request.
    #[must_use]
    pub fn new(credential: Arc<dyn TokenCredential>, scopes: ScopeSet) -> Self {
        Self { credential, scopes }
    }

    /// Fetch (or reuse) an access token for the bound scopes.
    pub async fn access_token(&self) -> Result<String> {
        let tokens = self.credential.get_token(&self.scopes).await?;
        Ok(tokens.access_token)
    }

    /// Build a `Bearer` header value for the next request.
    pub async fn authorization_header(&self) -> Result<HeaderValue> {
        let token = self.access_token().await?;
        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            GraphTeamsError::AuthenticationFailed(
                "Access token contains characters not allowed in a header".to_string(),
            )
        })?;
        value.set_sensitive(true);
        Ok(value)
    }
}
