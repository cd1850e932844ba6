//! Error types and result aliases for graphteams.
//!
//! This module provides the error taxonomy shared by the auth and dispatch layers:
//! - Configuration errors naming every missing identity field
//! - Authentication errors from the client-credentials and device-code grants
//! - Transport errors carrying the Graph `code`/`message` pair
//! - Automatic conversion from common error types

use std::sync::Arc;

use thiserror::Error;

/// Main error type for graphteams operations.
///
/// Skipped operations are not errors; see [`crate::teams::Dispatch`].
#[derive(Error, Debug, Clone)]
pub enum GraphTeamsError {
    /// Required identity configuration is missing for the requested session.
    #[error(
        "Missing required configuration: {}. Set it in the environment or in the config file.",
        .missing.join(", ")
    )]
    Configuration {
        /// Names of the missing settings, in their environment variable spelling.
        missing: Vec<&'static str>,
    },

    /// General configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}. Check file permissions and format.")]
    ConfigRead(String),

    /// Token exchange with the identity platform failed.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Device code expired before the user completed sign-in.
    #[error("Device code expired. Run the command again and complete sign-in within the time limit.")]
    DeviceAuthorizationExpired,

    /// User declined the sign-in request.
    #[error("Sign-in was declined. If this was unintentional, run the command again.")]
    AccessDenied,

    /// The signed-in session could not be renewed.
    #[error("The signed-in session expired and could not be renewed. Sign in again.")]
    SessionExpired,

    /// Graph returned a non-success status code.
    #[error("Graph request failed ({status} {code}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Graph error code (e.g. `Forbidden`).
        code: String,
        /// Error message from Graph.
        message: String,
    },

    /// Graph returned 401 Unauthorized.
    #[error("Graph returned unauthorized (401). The access token was rejected.")]
    Unauthorized,

    /// Graph is unreachable (connection failed).
    #[error("Microsoft Graph is unavailable. Check your network connection or try again later.")]
    ApiUnavailable,

    /// Request timed out.
    #[error("Request timed out. The server may be slow or unreachable. Try again later.")]
    Timeout,

    /// Network error during HTTP request.
    #[error("Network error: {0}. Check your internet connection.")]
    Network(String),

    /// JSON or TOML serialization/deserialization failed.
    #[error("Data serialization error: {0}")]
    Serialization(String),

    /// IO operation failed. Shared so the error stays cloneable.
    #[error("IO error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl GraphTeamsError {
    /// Checks if this error can be resolved by signing in again.
    ///
    /// Callers reset the auth manager when this returns `true`.
    #[must_use]
    pub const fn requires_reauth(&self) -> bool {
        matches!(
            self,
            Self::SessionExpired | Self::Unauthorized | Self::DeviceAuthorizationExpired
        )
    }

    /// Checks if Graph rejected the call for a missing permission or consent.
    ///
    /// Used only to pick guidance text for the user.
    #[must_use]
    pub fn is_permission_missing(&self) -> bool {
        match self {
            Self::Api { status, code, .. } => {
                *status == 403
                    || code == "Forbidden"
                    || code == "Authorization_RequestDenied"
                    || code == "AccessDenied"
            },
            Self::AccessDenied => true,
            _ => false,
        }
    }
}

/// Result type alias using [`GraphTeamsError`].
pub type Result<T> = std::result::Result<T, GraphTeamsError>;

impl From<std::io::Error> for GraphTeamsError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for GraphTeamsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON error: {err}"))
    }
}

impl From<toml::de::Error> for GraphTeamsError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigRead(format!("TOML parse error: {err}"))
    }
}

impl From<reqwest::Error> for GraphTeamsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::ApiUnavailable
        } else if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<reqwest_middleware::Error> for GraphTeamsError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(e) => e.into(),
            // Token acquisition failures travel through the middleware as anyhow errors.
            reqwest_middleware::Error::Middleware(e) => match e.downcast::<Self>() {
                Ok(inner) => inner,
                Err(other) => Self::Network(format!("{other:#}")),
            },
        }
    }
}
