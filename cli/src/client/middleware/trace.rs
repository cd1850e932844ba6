//! Request tracing middleware.

use async_trait::async_trait;
use http::Extensions;
use reqwest::{Request, Response, StatusCode};
use reqwest_middleware::{Middleware, Next, Result};

use crate::auth::AuthMode;

/// Middleware that logs every Graph call and flags rejected credentials.
pub struct TraceMiddleware {
    mode: AuthMode,
}

impl TraceMiddleware {
    /// Create a tracing middleware for a session of `mode`.
    #[must_use]
    pub const fn new(mode: AuthMode) -> Self {
        Self { mode }
    }
}

#[async_trait]
impl Middleware for TraceMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let method = req.method().clone();
        let path = req.url().path().to_string();
        tracing::debug!(mode = %self.mode, "{method} {path}");

        let response = next.run(req, extensions).await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                tracing::warn!(mode = %self.mode, "Graph rejected the access token for {path}");
            },
            StatusCode::FORBIDDEN => {
                tracing::warn!(mode = %self.mode, "Graph denied {method} {path}: missing permission");
            },
            status => tracing::debug!(mode = %self.mode, "{method} {path} -> {status}"),
        }

        Ok(response)
    }
}
