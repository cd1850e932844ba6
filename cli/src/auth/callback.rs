//! Local listener for the browser redirect leg of an interactive login.
//!
//! The device code flow does not need it; it exists for app registrations
//! that redirect to `http://localhost:{port}/auth/callback`.

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::error::Result;

/// Path the identity platform redirects to.
pub const CALLBACK_PATH: &str = "/auth/callback";

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Sign-in complete</title>
</head>
<body style="font-family: system-ui; text-align: center; padding-top: 50px;">
<h1 style="color: green;">Sign-in complete</h1>
<p style="color: #666;">You can close this window and return to the terminal.</p>
<script>setTimeout(() => window.close(), 3000);</script>
</body>
</html>"#;

const NOT_FOUND: &str = "404 - Page not found";

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

/// Build the callback router.
pub fn router() -> Router {
    Router::new()
        .route(CALLBACK_PATH, get(handle_callback))
        .fallback(not_found)
}

/// Serve the callback router on `127.0.0.1:{port}` until `shutdown` resolves.
pub async fn serve<F>(port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Callback listener on http://{addr}{CALLBACK_PATH}");

    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Callback listener stopped");
    Ok(())
}

async fn handle_callback(Query(params): Query<CallbackParams>) -> impl IntoResponse {
    match (params.error, params.code) {
        (Some(error), _) => {
            tracing::error!("Sign-in redirect reported an error: {error}");
            (
                StatusCode::BAD_REQUEST,
                error_page(&format!("Sign-in error: {error}")),
            )
        },
        (None, Some(_)) => {
            tracing::info!("Received authorization code");
            (StatusCode::OK, Html(SUCCESS_PAGE.to_string()))
        },
        (None, None) => (
            StatusCode::BAD_REQUEST,
            error_page("No authorization code or error was found in the redirect."),
        ),
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, NOT_FOUND)
}

fn error_page(message: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Sign-in error</title>
</head>
<body style="font-family: system-ui; text-align: center; padding-top: 50px;">
<h1 style="color: red;">Sign-in error</h1>
<p>{}</p>
<p style="color: #666;">You can close this window and return to the terminal.</p>
</body>
</html>"#,
        escape_html(message)
    ))
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;

    async fn get_page(uri: &str) -> (StatusCode, String) {
        let response = router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn code_yields_success_page() {
        let (status, body) = get_page("/auth/callback?code=abc").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Sign-in complete"));
    }

    #[tokio::test]
    async fn error_takes_precedence_and_is_escaped() {
        let (status, body) =
            get_page("/auth/callback?code=abc&error=%3Cscript%3Ebad%3C%2Fscript%3E").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("&lt;script&gt;bad&lt;/script&gt;"));
        assert!(!body.contains("<script>bad"));
    }

    #[tokio::test]
    async fn missing_parameters_yield_error_page() {
        let (status, body) = get_page("/auth/callback").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("No authorization code"));
    }

    #[tokio::test]
    async fn other_paths_are_not_found() {
        let (status, body) = get_page("/somewhere/else").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, NOT_FOUND);
    }
}
