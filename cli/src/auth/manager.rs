//! Memoized Graph sessions for the two authentication modes.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

use crate::auth::authority::Authority;
use crate::auth::credentials::{create_service_identity_credential, create_user_delegated_credential};
use crate::auth::device_flow::VerificationCallback;
use crate::auth::provider::TokenAuthProvider;
use crate::auth::scopes::ScopeSet;
use crate::auth::tokens::AuthMode;
use crate::client::{GraphClient, TeamsApi};
use crate::config::settings::env;
use crate::config::{ApiConfig, GraphTeamsConfig, IdentityConfig};
use crate::error::{GraphTeamsError, Result};

/// Where the dispatcher gets its sessions from (enables mocking in tests).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// Graph session acting as the app registration.
    async fn service_identity_session(&self) -> Result<Arc<dyn TeamsApi>>;

    /// Graph session acting as the signed-in user.
    async fn user_delegated_session(&self) -> Result<Arc<dyn TeamsApi>>;
}

/// An initialization every overlapping caller awaits, failure included.
type PendingSession = Shared<BoxFuture<'static, Result<Arc<GraphClient>>>>;

#[derive(Default)]
enum Session {
    #[default]
    Empty,
    Pending(PendingSession),
    Ready(Arc<GraphClient>),
}

#[derive(Default)]
struct SlotState {
    /// Bumped on every new initialization and on reset, so a stale
    /// outcome never overwrites a newer slot.
    attempt: u64,
    session: Session,
}

type SessionSlot = Mutex<SlotState>;

/// Configuration a session is built from.
struct SessionSettings {
    identity: IdentityConfig,
    api: ApiConfig,
    on_verification_prompt: VerificationCallback,
}

/// Owns one lazily created Graph session per [`AuthMode`].
///
/// A session is built on first use and handed out from then on. Callers that
/// arrive while it is being built share that attempt's outcome. A failed
/// attempt leaves the slot empty, so the next call starts over.
pub struct AuthManager {
    settings: Arc<SessionSettings>,
    service_identity: SessionSlot,
    user_delegated: SessionSlot,
}

impl AuthManager {
    /// Create a manager with both sessions uninitialized. Performs no I/O.
    #[must_use]
    pub fn new(config: &GraphTeamsConfig, on_verification_prompt: VerificationCallback) -> Self {
        Self {
            settings: Arc::new(SessionSettings {
                identity: config.identity.clone(),
                api: config.api.clone(),
                on_verification_prompt,
            }),
            service_identity: SessionSlot::default(),
            user_delegated: SessionSlot::default(),
        }
    }

    /// Session acting as the app registration (client-credentials grant).
    ///
    /// # Errors
    ///
    /// Returns [`GraphTeamsError::Configuration`] when `CLIENT_ID`,
    /// `CLIENT_SECRET` or `TENANT_ID` is missing.
    pub async fn service_identity_session(&self) -> Result<Arc<GraphClient>> {
        memoized(&self.service_identity, || {
            future::ready(create_service_identity_session(&self.settings)).boxed()
        })
        .await
    }

    /// Session acting as a signed-in user (device authorization grant).
    ///
    /// The first call blocks until the user completes sign-in.
    ///
    /// # Errors
    ///
    /// Returns [`GraphTeamsError::Configuration`] when `CLIENT_ID` or
    /// `TENANT_ID` is missing, or the sign-in error when the device code is
    /// declined or expires.
    pub async fn user_delegated_session(&self) -> Result<Arc<GraphClient>> {
        let settings = Arc::clone(&self.settings);
        memoized(&self.user_delegated, move || {
            create_user_delegated_session(settings).boxed()
        })
        .await
    }

    /// Forget both sessions. The next access builds a new one.
    pub async fn reset(&self) {
        for slot in [&self.service_identity, &self.user_delegated] {
            let mut state = slot.lock().await;
            state.attempt += 1;
            state.session = Session::Empty;
        }
        tracing::debug!("Cleared cached Graph sessions");
    }

    /// Whether the session for `mode` has been built.
    pub async fn is_ready(&self, mode: AuthMode) -> bool {
        let slot = match mode {
            AuthMode::ServiceIdentity => &self.service_identity,
            AuthMode::UserDelegated => &self.user_delegated,
        };
        matches!(slot.lock().await.session, Session::Ready(_))
    }
}

fn create_service_identity_session(settings: &SessionSettings) -> Result<Arc<GraphClient>> {
    let identity = &settings.identity;
    let client_id = non_empty(identity.client_id.as_deref());
    let client_secret = non_empty(identity.client_secret.as_deref());
    let tenant_id = non_empty(identity.tenant_id.as_deref());

    let (Some(client_id), Some(client_secret), Some(tenant_id)) =
        (client_id, client_secret, tenant_id)
    else {
        return Err(missing_configuration(&[
            (env::CLIENT_ID, client_id.is_none()),
            (env::CLIENT_SECRET, client_secret.is_none()),
            (env::TENANT_ID, tenant_id.is_none()),
        ]));
    };

    tracing::debug!(tenant = %tenant_id, "Creating service identity session");

    let authority = Authority::for_tenant(&settings.api.authority_url, tenant_id)?;
    let credential =
        create_service_identity_credential(&authority, tenant_id, client_id, client_secret);
    let provider = Arc::new(TokenAuthProvider::new(
        Arc::new(credential),
        ScopeSet::service_identity(),
    ));

    let client = GraphClient::new(&settings.api, AuthMode::ServiceIdentity, provider)?;
    Ok(Arc::new(client))
}

async fn create_user_delegated_session(settings: Arc<SessionSettings>) -> Result<Arc<GraphClient>> {
    let identity = &settings.identity;
    let client_id = non_empty(identity.client_id.as_deref());
    let tenant_id = non_empty(identity.tenant_id.as_deref());

    let (Some(client_id), Some(tenant_id)) = (client_id, tenant_id) else {
        return Err(missing_configuration(&[
            (env::CLIENT_ID, client_id.is_none()),
            (env::TENANT_ID, tenant_id.is_none()),
        ]));
    };

    tracing::debug!(tenant = %tenant_id, "Creating user delegated session");

    let authority = Authority::for_tenant(&settings.api.authority_url, tenant_id)?;
    let credential = create_user_delegated_credential(
        &authority,
        tenant_id,
        client_id,
        Arc::clone(&settings.on_verification_prompt),
    );
    let provider = Arc::new(TokenAuthProvider::new(
        Arc::new(credential),
        ScopeSet::user_delegated(),
    ));

    // Sign in now, while the slot is still pending, so the prompt is shown once.
    provider.access_token().await?;

    let client = GraphClient::new(&settings.api, AuthMode::UserDelegated, provider)?;
    Ok(Arc::new(client))
}

#[async_trait]
impl SessionSource for AuthManager {
    async fn service_identity_session(&self) -> Result<Arc<dyn TeamsApi>> {
        let client: Arc<dyn TeamsApi> = Self::service_identity_session(self).await?;
        Ok(client)
    }

    async fn user_delegated_session(&self) -> Result<Arc<dyn TeamsApi>> {
        let client: Arc<dyn TeamsApi> = Self::user_delegated_session(self).await?;
        Ok(client)
    }
}

/// Hand out the slot's session, joining a pending attempt or starting one.
async fn memoized<F>(slot: &SessionSlot, init: F) -> Result<Arc<GraphClient>>
where
    F: FnOnce() -> BoxFuture<'static, Result<Arc<GraphClient>>>,
{
    let (attempt, pending) = {
        let mut state = slot.lock().await;
        let joined = match &state.session {
            Session::Ready(client) => return Ok(Arc::clone(client)),
            Session::Pending(pending) => Some(pending.clone()),
            Session::Empty => None,
        };
        match joined {
            Some(pending) => (state.attempt, pending),
            None => {
                state.attempt += 1;
                let pending = init().shared();
                state.session = Session::Pending(pending.clone());
                (state.attempt, pending)
            },
        }
    };

    let outcome = pending.await;

    let mut state = slot.lock().await;
    if state.attempt == attempt {
        state.session = match &outcome {
            Ok(client) => Session::Ready(Arc::clone(client)),
            Err(_) => Session::Empty,
        };
    }
    outcome
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn missing_configuration(fields: &[(&'static str, bool)]) -> GraphTeamsError {
    let missing = fields
        .iter()
        .filter(|(_, is_missing)| *is_missing)
        .map(|(name, _)| *name)
        .collect();
    GraphTeamsError::Configuration { missing }
}
