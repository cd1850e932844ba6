//! Permission scopes requested by each authentication mode.

use oauth2::Scope;

/// Scopes for the service identity: whatever application permissions the
/// app registration was granted.
pub const SERVICE_IDENTITY_SCOPES: &[&str] = &["https://graph.microsoft.com/.default"];

/// Delegated scopes covering team/channel/message read and send.
pub const USER_DELEGATED_SCOPES: &[&str] = &[
    "Team.ReadBasic.All",
    "Channel.ReadBasic.All",
    "ChannelMessage.Read.All",
    "ChannelMessage.Send",
    "offline_access",
];

/// Ordered, immutable set of scopes bound to one credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeSet(Vec<Scope>);

impl ScopeSet {
    /// Build a scope set from scope strings, preserving order and dropping duplicates.
    #[must_use]
    pub fn new(scopes: &[&str]) -> Self {
        let mut set: Vec<Scope> = Vec::with_capacity(scopes.len());
        for scope in scopes {
            let scope = Scope::new((*scope).to_string());
            if !set.contains(&scope) {
                set.push(scope);
            }
        }
        Self(set)
    }

    /// Scopes for the client-credentials flow.
    #[must_use]
    pub fn service_identity() -> Self {
        Self::new(SERVICE_IDENTITY_SCOPES)
    }

    /// Scopes for the device-code flow.
    #[must_use]
    pub fn user_delegated() -> Self {
        Self::new(USER_DELEGATED_SCOPES)
    }

    /// Owned copies for an oauth2 request builder.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Scope> {
        self.0.clone()
    }
}

impl std::fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        f.write_str(&joined)
    }
}
