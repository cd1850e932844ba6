//! OAuth device authorization flow implementation (RFC 8628).

use std::sync::Arc;
use std::time::Duration;

use oauth2::basic::{BasicClient, BasicErrorResponseType};
use oauth2::devicecode::{DeviceCodeErrorResponse, DeviceCodeErrorResponseType};
use oauth2::reqwest::async_http_client;
use oauth2::{RequestTokenError, StandardDeviceAuthorizationResponse};

use crate::auth::scopes::ScopeSet;
use crate::auth::tokens::{describe_token_error, TokenSet};
use crate::error::{GraphTeamsError, Result};

/// What the user needs in order to complete sign-in on another device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationPrompt {
    /// URL for the user to visit.
    pub verification_uri: String,
    /// Complete URL with code (if available).
    pub verification_uri_complete: Option<String>,
    /// Code for the user to enter.
    pub user_code: String,
    /// How long until the code expires.
    pub expires_in: Duration,
}

/// Callback invoked with the verification prompt while a device code is pending.
pub type VerificationCallback = Arc<dyn Fn(&VerificationPrompt) + Send + Sync>;

/// Response from initiating device authorization.
pub struct DeviceAuthResponse {
    /// Details to show the user.
    pub prompt: VerificationPrompt,
    /// Internal response for polling.
    inner: StandardDeviceAuthorizationResponse,
}

/// Start the device authorization flow.
///
/// Returns the verification URL and user code for the user to complete authentication.
///
/// # Errors
///
/// Returns an error if the device authorization request fails.
pub async fn start_device_flow(
    client: &BasicClient,
    scopes: &ScopeSet,
) -> Result<DeviceAuthResponse> {
    let mut request = client.exchange_device_code().map_err(|e| {
        GraphTeamsError::AuthenticationFailed(format!("Device flow not supported: {e}"))
    })?;

    for scope in scopes.to_vec() {
        request = request.add_scope(scope);
    }

    let response: StandardDeviceAuthorizationResponse = request
        .request_async(async_http_client)
        .await
        .map_err(|e| {
            GraphTeamsError::AuthenticationFailed(format!(
                "Device authorization failed: {}",
                describe_token_error(&e)
            ))
        })?;

    Ok(DeviceAuthResponse {
        prompt: VerificationPrompt {
            verification_uri: response.verification_uri().to_string(),
            verification_uri_complete: response
                .verification_uri_complete()
                .map(|u| u.secret().clone()),
            user_code: response.user_code().secret().clone(),
            expires_in: response.expires_in(),
        },
        inner: response,
    })
}

/// Poll for token completion.
///
/// This will poll the token endpoint until the user completes authorization
/// or the device code expires.
///
/// # Errors
///
/// Returns an error if:
/// - The device code expires
/// - The user denies access
/// - A network error occurs
pub async fn poll_for_token(
    client: &BasicClient,
    device_auth: &DeviceAuthResponse,
) -> Result<TokenSet> {
    let token_response = client
        .exchange_device_access_token(&device_auth.inner)
        .request_async(async_http_client, tokio::time::sleep, None)
        .await
        .map_err(map_poll_error)?;

    Ok(TokenSet::from(&token_response))
}

fn map_poll_error<RE>(err: RequestTokenError<RE, DeviceCodeErrorResponse>) -> GraphTeamsError
where
    RE: std::error::Error + 'static,
{
    match &err {
        RequestTokenError::ServerResponse(response) => match response.error() {
            DeviceCodeErrorResponseType::ExpiredToken => GraphTeamsError::DeviceAuthorizationExpired,
            DeviceCodeErrorResponseType::AccessDenied => GraphTeamsError::AccessDenied,
            // The identity platform reports a declined prompt with its own code.
            DeviceCodeErrorResponseType::Basic(BasicErrorResponseType::Extension(code))
                if code == "authorization_declined" =>
            {
                GraphTeamsError::AccessDenied
            },
            _ => exchange_failed(&err),
        },
        RequestTokenError::Other(message) if message.contains("expired") => {
            GraphTeamsError::DeviceAuthorizationExpired
        },
        _ => exchange_failed(&err),
    }
}

fn exchange_failed<RE>(err: &RequestTokenError<RE, DeviceCodeErrorResponse>) -> GraphTeamsError
where
    RE: std::error::Error + 'static,
{
    GraphTeamsError::AuthenticationFailed(format!(
        "Token exchange failed: {}",
        describe_token_error(err)
    ))
}

/// Open the verification URL in the default browser.
///
/// Returns `true` if the browser was opened successfully, `false` otherwise.
pub fn open_browser(prompt: &VerificationPrompt) -> bool {
    let url = prompt
        .verification_uri_complete
        .as_ref()
        .unwrap_or(&prompt.verification_uri);

    open::that(url).is_ok()
}
