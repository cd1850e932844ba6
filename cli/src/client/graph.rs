//! Microsoft Graph client for the Teams endpoints graphteams uses.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::auth::{AuthMode, TokenAuthProvider};
use crate::client::middleware::{AuthMiddleware, TraceMiddleware};
use crate::config::ApiConfig;
use crate::error::{GraphTeamsError, Result};
use crate::teams::models::{
    Channel, ChatMessage, GraphList, OutgoingMessage, PostedMessage, Team,
};

/// Fields requested when listing teams and channels.
const SUMMARY_FIELDS: &str = "id,displayName,description";

/// Largest `$top` Graph accepts for channel messages.
const MAX_MESSAGES_PAGE: usize = 50;

/// Teams operations against Graph (enables mocking in tests).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TeamsApi: Send + Sync {
    /// `GET /teams`.
    async fn list_teams(&self) -> Result<Vec<Team>>;

    /// `GET /teams/{team}/channels`.
    async fn list_channels(&self, team_id: &str) -> Result<Vec<Channel>>;

    /// `GET /teams/{team}/channels/{channel}/messages?$top={top}`.
    ///
    /// Graph does not promise any particular order.
    async fn list_channel_messages(
        &self,
        team_id: &str,
        channel_id: &str,
        top: usize,
    ) -> Result<Vec<ChatMessage>>;

    /// `POST /teams/{team}/channels/{channel}/messages`.
    async fn post_channel_message(
        &self,
        team_id: &str,
        channel_id: &str,
        message: &OutgoingMessage,
    ) -> Result<PostedMessage>;
}

#[derive(Deserialize)]
struct GraphErrorEnvelope {
    error: GraphErrorBody,
}

#[derive(Deserialize)]
struct GraphErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Graph client bound to one authentication mode.
pub struct GraphClient {
    client: ClientWithMiddleware,
    base_url: Url,
    mode: AuthMode,
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient")
            .field("base_url", &self.base_url.as_str())
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl GraphClient {
    /// Create a new Graph client whose requests are authorized by `provider`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig, mode: AuthMode, provider: Arc<TokenAuthProvider>) -> Result<Self> {
        let inner_client = Client::builder()
            .user_agent(format!("graphteams/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        // Build middleware stack
        let client = ClientBuilder::new(inner_client)
            .with(TraceMiddleware::new(mode))
            .with(AuthMiddleware::new(provider))
            .build();

        Ok(Self {
            client,
            base_url: config.graph_url.clone(),
            mode,
        })
    }

    /// The identity this client acts as.
    #[must_use]
    pub const fn mode(&self) -> AuthMode {
        self.mode
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                GraphTeamsError::Config(format!("Graph URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_list<T: DeserializeOwned>(&self, url: Url, query: &[(&str, String)]) -> Result<Vec<T>> {
        let response = self.client.get(url).query(query).send().await?;
        let list: GraphList<T> = check_status(response).await?.json().await?;
        Ok(list.value)
    }
}

/// Turn a non-success response into [`GraphTeamsError`], keeping Graph's error code.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(GraphTeamsError::Unauthorized);
    }

    let body = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<GraphErrorEnvelope>(&body) {
        Ok(envelope) => (envelope.error.code, envelope.error.message),
        Err(_) => (
            status.canonical_reason().unwrap_or("Unknown").to_string(),
            body,
        ),
    };

    Err(GraphTeamsError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}

#[async_trait]
impl TeamsApi for GraphClient {
    async fn list_teams(&self) -> Result<Vec<Team>> {
        let url = self.endpoint(&["teams"])?;
        self.get_list(url, &[("$select", SUMMARY_FIELDS.to_string())])
            .await
    }

    async fn list_channels(&self, team_id: &str) -> Result<Vec<Channel>> {
        let url = self.endpoint(&["teams", team_id, "channels"])?;
        self.get_list(url, &[("$select", SUMMARY_FIELDS.to_string())])
            .await
    }

    async fn list_channel_messages(
        &self,
        team_id: &str,
        channel_id: &str,
        top: usize,
    ) -> Result<Vec<ChatMessage>> {
        let url = self.endpoint(&["teams", team_id, "channels", channel_id, "messages"])?;
        let top = top.clamp(1, MAX_MESSAGES_PAGE);
        self.get_list(url, &[("$top", top.to_string())]).await
    }

    async fn post_channel_message(
        &self,
        team_id: &str,
        channel_id: &str,
        message: &OutgoingMessage,
    ) -> Result<PostedMessage> {
        let url = self.endpoint(&["teams", team_id, "channels", channel_id, "messages"])?;
        tracing::debug!(import = message.is_import(), "Posting channel message");
        let response = self.client.post(url).json(message).send().await?;
        let posted = check_status(response).await?.json().await?;
        Ok(posted)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::test_support::static_provider;

    async fn client_for(server: &MockServer) -> GraphClient {
        let config = ApiConfig {
            graph_url: Url::parse(&format!("{}/v1.0/", server.uri())).unwrap(),
            ..ApiConfig::default()
        };
        GraphClient::new(&config, AuthMode::ServiceIdentity, static_provider("test-token")).unwrap()
    }

    #[tokio::test]
    async fn list_teams_selects_summary_fields_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/teams"))
            .and(query_param("$select", "id,displayName,description"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    {"id": "team-1", "displayName": "Test Team 1", "description": "Team 1 Description"},
                    {"id": "team-2", "displayName": "Test Team 2"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let teams = client_for(&server).await.list_teams().await.unwrap();

        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].description.as_deref(), Some("Team 1 Description"));
        assert_eq!(teams[1].description, None);
    }

    #[tokio::test]
    async fn list_channels_uses_team_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/teams/team-1/channels"))
            .and(query_param("$select", "id,displayName,description"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"id": "channel-1", "displayName": "General"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let channels = client_for(&server)
            .await
            .list_channels("team-1")
            .await
            .unwrap();

        assert_eq!(channels[0].display_name, "General");
    }

    #[tokio::test]
    async fn list_messages_passes_top() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/teams/t/channels/c/messages"))
            .and(query_param("$top", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
            .expect(1)
            .mount(&server)
            .await;

        let messages = client_for(&server)
            .await
            .list_channel_messages("t", "c", 5)
            .await
            .unwrap();

        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn post_message_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.0/teams/t/channels/c/messages"))
            .and(body_json(json!({"body": {"contentType": "text", "content": "hello"}})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "msg-9"})))
            .expect(1)
            .mount(&server)
            .await;

        let posted = client_for(&server)
            .await
            .post_channel_message("t", "c", &OutgoingMessage::text("hello"))
            .await
            .unwrap();

        assert_eq!(posted.id, "msg-9");
    }

    #[tokio::test]
    async fn graph_error_body_becomes_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/teams"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": "Forbidden", "message": "Missing role permissions on the request."}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).await.list_teams().await.unwrap_err();

        match &err {
            GraphTeamsError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(*status, 403);
                assert_eq!(code, "Forbidden");
                assert!(message.contains("Missing role permissions"));
            },
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_permission_missing());
    }

    #[tokio::test]
    async fn unauthorized_maps_to_dedicated_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/teams"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server).await.list_teams().await.unwrap_err();
        assert!(matches!(err, GraphTeamsError::Unauthorized));
    }

    #[tokio::test]
    async fn token_failure_is_surfaced_without_calling_graph() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = ApiConfig {
            graph_url: Url::parse(&format!("{}/v1.0/", server.uri())).unwrap(),
            ..ApiConfig::default()
        };
        let client = GraphClient::new(
            &config,
            AuthMode::UserDelegated,
            crate::auth::test_support::failing_provider(),
        )
        .unwrap();

        let err = client.list_teams().await.unwrap_err();
        assert!(matches!(err, GraphTeamsError::AccessDenied));
    }

    #[tokio::test]
    async fn debug_output_shows_endpoint_and_mode_only() {
        let server = MockServer::start().await;
        let rendered = format!("{:?}", client_for(&server).await);

        assert!(rendered.contains("/v1.0/"));
        assert!(rendered.contains("ServiceIdentity"));
        assert!(!rendered.contains("test-token"));
    }
}
