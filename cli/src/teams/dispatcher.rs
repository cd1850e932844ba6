//! Maps Teams operations onto Graph sessions.
//!
//! Reads go through the service identity. Sends go through the signed-in
//! user first and fall back to a service identity import post.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::{AuthMode, SessionSource};
use crate::error::{GraphTeamsError, Result};
use crate::teams::models::{Channel, ChannelMessage, Delivery, OutgoingMessage, Team};

/// Messages fetched when the caller does not ask for a count.
pub const DEFAULT_MESSAGE_COUNT: usize = 10;

/// Result of an operation that may be skipped for missing input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch<T> {
    /// The operation ran.
    Completed(T),
    /// The operation did not run; no session was touched.
    Skipped(SkipReason),
}

/// Why an operation was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No team ID was given.
    MissingTeamId,
    /// No channel ID was given.
    MissingChannelId,
    /// The message was empty or whitespace.
    BlankContent,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTeamId => write!(f, "no team ID was given (set TARGET_TEAM_ID)"),
            Self::MissingChannelId => {
                write!(f, "no channel ID was given (set TARGET_CHANNEL_ID)")
            },
            Self::BlankContent => write!(f, "the message is empty"),
        }
    }
}

/// Runs Teams operations against the sessions of an auth manager.
pub struct RequestDispatcher {
    sessions: Arc<dyn SessionSource>,
    import_sender_name: String,
}

impl RequestDispatcher {
    /// Create a dispatcher. `import_sender_name` labels fallback import posts.
    pub fn new(sessions: Arc<dyn SessionSource>, import_sender_name: impl Into<String>) -> Self {
        Self {
            sessions,
            import_sender_name: import_sender_name.into(),
        }
    }

    /// List the teams the service identity can see.
    pub async fn list_teams(&self) -> Result<Vec<Team>> {
        tracing::info!("Listing teams visible to the application");

        let result = async {
            let session = self.sessions.service_identity_session().await?;
            session.list_teams().await
        }
        .await;

        let teams = result.inspect_err(|e| report("list teams", e))?;
        if teams.is_empty() {
            tracing::info!("No teams found");
        }
        Ok(teams)
    }

    /// List the channels of `team_id`.
    pub async fn list_channels(&self, team_id: &str) -> Result<Dispatch<Vec<Channel>>> {
        if let Some(reason) = missing_target(team_id, None) {
            return Ok(skip("channel listing", reason));
        }
        tracing::info!(team = %team_id, "Listing channels");

        let result = async {
            let session = self.sessions.service_identity_session().await?;
            session.list_channels(team_id).await
        }
        .await;

        let channels = result.inspect_err(|e| report("list channels", e))?;
        if channels.is_empty() {
            tracing::info!(team = %team_id, "No channels found");
        }
        Ok(Dispatch::Completed(channels))
    }

    /// The `top` most recent messages of a channel, newest first.
    pub async fn list_channel_messages(
        &self,
        team_id: &str,
        channel_id: &str,
        top: usize,
    ) -> Result<Dispatch<Vec<ChannelMessage>>> {
        if let Some(reason) = missing_target(team_id, Some(channel_id)) {
            return Ok(skip("message listing", reason));
        }
        if top == 0 {
            return Ok(Dispatch::Completed(Vec::new()));
        }
        tracing::info!(team = %team_id, channel = %channel_id, top, "Listing channel messages");

        let result = async {
            let session = self.sessions.service_identity_session().await?;
            session.list_channel_messages(team_id, channel_id, top).await
        }
        .await;

        let raw = result.inspect_err(|e| report("list channel messages", e))?;
        let mut messages: Vec<ChannelMessage> = raw.into_iter().map(ChannelMessage::from).collect();
        // Graph does not guarantee recency order; undated messages go last.
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        messages.truncate(top);

        if messages.is_empty() {
            tracing::info!(channel = %channel_id, "No messages found");
        }
        Ok(Dispatch::Completed(messages))
    }

    /// Post `content` to a channel.
    ///
    /// Tries a live post as the signed-in user first. If that fails for any
    /// reason, posts an import message as the service identity instead. When
    /// both fail, the import error is returned and the delegated one is only
    /// logged.
    pub async fn send_message(
        &self,
        team_id: &str,
        channel_id: &str,
        content: &str,
    ) -> Result<Dispatch<Delivery>> {
        if let Some(reason) = missing_target(team_id, Some(channel_id)) {
            return Ok(skip("message send", reason));
        }
        if content.trim().is_empty() {
            return Ok(skip("message send", SkipReason::BlankContent));
        }
        tracing::info!(team = %team_id, channel = %channel_id, "Sending message");

        let delegated = async {
            let session = self.sessions.user_delegated_session().await?;
            session
                .post_channel_message(team_id, channel_id, &OutgoingMessage::text(content))
                .await
        }
        .await;

        match delegated {
            Ok(posted) => {
                tracing::info!(id = %posted.id, "Message sent as the signed-in user");
                return Ok(Dispatch::Completed(Delivery {
                    mode: AuthMode::UserDelegated,
                    message_id: posted.id,
                }));
            },
            Err(e) => {
                tracing::warn!("Sending as the signed-in user failed, retrying as an import post: {e}");
            },
        }

        let message = OutgoingMessage::import(content, &self.import_sender_name, Utc::now());
        let imported = async {
            let session = self.sessions.service_identity_session().await?;
            session
                .post_channel_message(team_id, channel_id, &message)
                .await
        }
        .await;

        let posted = imported.inspect_err(|e| report("send message", e))?;
        tracing::info!(id = %posted.id, "Message sent as an import post");
        Ok(Dispatch::Completed(Delivery {
            mode: AuthMode::ServiceIdentity,
            message_id: posted.id,
        }))
    }
}

fn missing_target(team_id: &str, channel_id: Option<&str>) -> Option<SkipReason> {
    if team_id.trim().is_empty() {
        return Some(SkipReason::MissingTeamId);
    }
    match channel_id {
        Some(channel_id) if channel_id.trim().is_empty() => Some(SkipReason::MissingChannelId),
        _ => None,
    }
}

fn skip<T>(operation: &str, reason: SkipReason) -> Dispatch<T> {
    tracing::warn!("Skipping {operation}: {reason}");
    Dispatch::Skipped(reason)
}

fn report(operation: &str, err: &GraphTeamsError) {
    tracing::error!("Failed to {operation}: {err}");
    if err.is_permission_missing() {
        tracing::warn!(
            "The app registration may be missing a Graph permission or admin consent for this call"
        );
    }
}
