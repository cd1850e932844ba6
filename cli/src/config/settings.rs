//! Application configuration settings.

use serde::{Deserialize, Serialize};
use url::Url;

/// Main configuration for graphteams.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphTeamsConfig {
    /// App registration used by both authentication modes.
    pub identity: IdentityConfig,
    /// Team and channel the channel/message commands act on.
    pub target: TargetConfig,
    /// Endpoints and HTTP settings.
    pub api: ApiConfig,
    /// Local OAuth redirect listener.
    pub callback: CallbackConfig,
    /// Message sending settings.
    pub send: SendConfig,
}

/// Azure AD app registration.
///
/// Every field is optional here; the auth manager decides which ones a
/// session actually needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Application (client) ID.
    pub client_id: Option<String>,
    /// Client secret, only needed for the service identity mode.
    pub client_secret: Option<String>,
    /// Directory (tenant) ID.
    pub tenant_id: Option<String>,
}

/// Default team and channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Team ID.
    pub team_id: Option<String>,
    /// Channel ID within the team.
    pub channel_id: Option<String>,
}

/// API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Microsoft Graph base URL, including the version segment.
    #[serde(with = "url_serde")]
    pub graph_url: Url,
    /// Identity platform authority; the tenant ID is appended to it.
    #[serde(with = "url_serde")]
    pub authority_url: Url,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            graph_url: Url::parse("https://graph.microsoft.com/v1.0/").expect("valid default URL"),
            authority_url: Url::parse("https://login.microsoftonline.com/")
                .expect("valid default URL"),
            timeout_secs: 30,
        }
    }
}

/// Local callback listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackConfig {
    /// Port to bind on localhost.
    pub port: u16,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

/// Message sending configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SendConfig {
    /// Display name stamped on import posts made with the service identity.
    pub import_sender_name: String,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            import_sender_name: "System".to_string(),
        }
    }
}

/// Custom serde module for URL serialization.
mod url_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use url::Url;

    pub fn serialize<S>(url: &Url, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(url.as_str())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Url, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Url::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Environment variables that can override configuration.
pub mod env {
    pub const CLIENT_ID: &str = "CLIENT_ID";
    pub const CLIENT_SECRET: &str = "CLIENT_SECRET";
    pub const TENANT_ID: &str = "TENANT_ID";
    pub const TARGET_TEAM_ID: &str = "TARGET_TEAM_ID";
    pub const TARGET_CHANNEL_ID: &str = "TARGET_CHANNEL_ID";
    pub const GRAPH_URL: &str = "GRAPHTEAMS_GRAPH_URL";
    pub const AUTHORITY_URL: &str = "GRAPHTEAMS_AUTHORITY_URL";
    pub const LOG_LEVEL: &str = "GRAPHTEAMS_LOG";
}

impl GraphTeamsConfig {
    /// Apply environment variable overrides to the configuration.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    #[must_use]
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides = [
            (env::CLIENT_ID, &mut self.identity.client_id),
            (env::CLIENT_SECRET, &mut self.identity.client_secret),
            (env::TENANT_ID, &mut self.identity.tenant_id),
            (env::TARGET_TEAM_ID, &mut self.target.team_id),
            (env::TARGET_CHANNEL_ID, &mut self.target.channel_id),
        ];
        for (key, slot) in overrides {
            if let Some(value) = lookup(key) {
                *slot = Some(value);
            }
        }

        if let Some(url) = lookup(env::GRAPH_URL) {
            match Url::parse(&url) {
                Ok(parsed) => self.api.graph_url = parsed,
                Err(e) => tracing::warn!("Ignoring {}: {e}", env::GRAPH_URL),
            }
        }

        if let Some(url) = lookup(env::AUTHORITY_URL) {
            match Url::parse(&url) {
                Ok(parsed) => self.api.authority_url = parsed,
                Err(e) => tracing::warn!("Ignoring {}: {e}", env::AUTHORITY_URL),
            }
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_point_at_public_cloud() {
        let config = GraphTeamsConfig::default();
        assert_eq!(config.api.graph_url.as_str(), "https://graph.microsoft.com/v1.0/");
        assert_eq!(
            config.api.authority_url.as_str(),
            "https://login.microsoftonline.com/"
        );
        assert_eq!(config.callback.port, 3000);
        assert_eq!(config.send.import_sender_name, "System");
        assert!(config.identity.client_id.is_none());
    }

    #[test]
    fn overrides_replace_identity_and_targets() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("CLIENT_ID", "client"),
            ("TENANT_ID", "tenant"),
            ("TARGET_TEAM_ID", "team"),
            ("GRAPHTEAMS_GRAPH_URL", "http://localhost:9000/v1.0/"),
        ]);

        let config = GraphTeamsConfig::default()
            .with_overrides_from(|key| vars.get(key).map(ToString::to_string));

        assert_eq!(config.identity.client_id.as_deref(), Some("client"));
        assert_eq!(config.identity.tenant_id.as_deref(), Some("tenant"));
        assert!(config.identity.client_secret.is_none());
        assert_eq!(config.target.team_id.as_deref(), Some("team"));
        assert!(config.target.channel_id.is_none());
        assert_eq!(config.api.graph_url.as_str(), "http://localhost:9000/v1.0/");
    }

    #[test]
    fn invalid_url_override_is_ignored() {
        let config = GraphTeamsConfig::default().with_overrides_from(|key| {
            (key == env::AUTHORITY_URL).then(|| "not a url".to_string())
        });
        assert_eq!(
            config.api.authority_url.as_str(),
            "https://login.microsoftonline.com/"
        );
    }
}
