//! Authentication middleware for injecting Bearer tokens.

use std::sync::Arc;

use async_trait::async_trait;
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result};

use crate::auth::TokenAuthProvider;

/// Middleware that injects the Bearer token into requests.
///
/// A token failure aborts the request; the underlying error is recovered on
/// the other side through `From<reqwest_middleware::Error>`.
pub struct AuthMiddleware {
    provider: Arc<TokenAuthProvider>,
}

impl AuthMiddleware {
    /// Create a new authentication middleware.
    #[must_use]
    pub fn new(provider: Arc<TokenAuthProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let value = self
            .provider
            .authorization_header()
            .await
            .map_err(|e| reqwest_middleware::Error::Middleware(anyhow::Error::new(e)))?;
        req.headers_mut().insert(http::header::AUTHORIZATION, value);

        next.run(req, extensions).await
    }
}
