//! Graph resources for teams, channels and channel messages.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::auth::AuthMode;

/// Sender label used when Graph reports neither a user nor an application.
pub const UNKNOWN_SENDER: &str = "Unknown sender";

/// Application id stamped on import posts.
pub const IMPORT_SENDER_ID: &str = "graphteams-import";

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>?").expect("valid markup pattern"));

/// List response wrapper (`{"value": [...]}`).
#[derive(Debug, Deserialize)]
pub struct GraphList<T> {
    /// The page of results.
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// A team visible to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Team (group) ID.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub display_name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

/// A channel inside a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    /// Channel ID.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub display_name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Body format of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    /// Plain text.
    Text,
    /// HTML markup.
    Html,
}

/// Message body (`itemBody`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBody {
    /// Text or HTML.
    #[serde(default)]
    pub content_type: Option<BodyType>,
    /// Raw content.
    #[serde(default)]
    pub content: Option<String>,
}

/// One identity inside an identity set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Object ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// `from` of a message: a user, an application, or neither.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySet {
    /// Human sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Identity>,
    /// Application sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<Identity>,
}

/// Channel message as Graph returns it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message ID.
    pub id: String,
    /// Creation timestamp.
    #[serde(default)]
    pub created_date_time: Option<DateTime<Utc>>,
    /// Sender; null for system messages.
    #[serde(default)]
    pub from: Option<IdentitySet>,
    /// Body.
    #[serde(default)]
    pub body: Option<ItemBody>,
}

/// Who posted a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sender {
    /// A signed-in user.
    User(String),
    /// An application or bot.
    Application(String),
    /// Graph did not say.
    Unknown,
}

impl Sender {
    fn from_identity_set(from: Option<&IdentitySet>) -> Self {
        let name_of = |identity: Option<&Identity>| {
            identity
                .and_then(|i| i.display_name.clone())
                .filter(|name| !name.trim().is_empty())
        };

        let Some(from) = from else {
            return Self::Unknown;
        };
        if let Some(name) = name_of(from.user.as_ref()) {
            Self::User(name)
        } else if let Some(name) = name_of(from.application.as_ref()) {
            Self::Application(name)
        } else {
            Self::Unknown
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(name) | Self::Application(name) => f.write_str(name),
            Self::Unknown => f.write_str(UNKNOWN_SENDER),
        }
    }
}

/// A channel message reduced for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    /// Message ID.
    pub id: String,
    /// Creation timestamp, if Graph reported one.
    pub created_at: Option<DateTime<Utc>>,
    /// Sender.
    pub sender: Sender,
    /// Body with markup removed.
    pub plain_text_body: String,
}

impl From<ChatMessage> for ChannelMessage {
    fn from(message: ChatMessage) -> Self {
        let sender = Sender::from_identity_set(message.from.as_ref());
        let plain_text_body = message
            .body
            .map(|body| match (body.content_type, body.content) {
                (Some(BodyType::Html), Some(content)) => strip_markup(&content),
                (_, content) => content.unwrap_or_default(),
            })
            .unwrap_or_default();

        Self {
            id: message.id,
            created_at: message.created_date_time,
            sender,
            plain_text_body,
        }
    }
}

/// Remove every `<...>` tag. Entities such as `&amp;` are left as they are.
#[must_use]
pub fn strip_markup(html: &str) -> String {
    MARKUP_TAG.replace_all(html, "").into_owned()
}

/// Request body for posting a channel message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    /// Backdated creation time; only set on import posts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date_time: Option<DateTime<Utc>>,
    /// Synthetic sender; only set on import posts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<IdentitySet>,
    /// Body.
    pub body: ItemBody,
    /// Always `message` on import posts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    /// Always `normal` on import posts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<String>,
}

impl OutgoingMessage {
    /// Live post as the signed-in user.
    #[must_use]
    pub fn text(content: &str) -> Self {
        Self {
            created_date_time: None,
            from: None,
            body: ItemBody {
                content_type: Some(BodyType::Text),
                content: Some(content.to_string()),
            },
            message_type: None,
            importance: None,
        }
    }

    /// Import post made by the service identity, stamped with a synthetic
    /// application sender and `created_at`.
    #[must_use]
    pub fn import(content: &str, sender_name: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            created_date_time: Some(created_at),
            from: Some(IdentitySet {
                user: None,
                application: Some(Identity {
                    id: Some(IMPORT_SENDER_ID.to_string()),
                    display_name: Some(sender_name.to_string()),
                }),
            }),
            message_type: Some("message".to_string()),
            importance: Some("normal".to_string()),
            ..Self::text(content)
        }
    }

    /// Whether this is an import post.
    #[must_use]
    pub const fn is_import(&self) -> bool {
        self.created_date_time.is_some()
    }
}

/// What Graph returns after a post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostedMessage {
    /// ID of the created message.
    #[serde(default)]
    pub id: String,
}

/// Outcome of a successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Identity that made the post.
    pub mode: AuthMode,
    /// ID of the created message.
    pub message_id: String,
}
