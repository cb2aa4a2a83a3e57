use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// Identifier used when the author of an event cannot be resolved.
pub const PLACEHOLDER_USER_ID: &str = "0";

/// Name used when the author of an event cannot be resolved.
pub const PLACEHOLDER_USER_NAME: &str = "Unknown user";

/// A chat participant as seen on one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub username: String,
    /// Legacy four-digit discriminator; `None` or `"0"` for migrated accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl Participant {
    /// Stand-in identity for events whose author is missing.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            id: PLACEHOLDER_USER_ID.into(),
            username: PLACEHOLDER_USER_NAME.into(),
            discriminator: None,
            global_name: None,
            avatar_url: None,
            bot: false,
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.id == PLACEHOLDER_USER_ID
    }

    /// Name shown in transcripts: the global display name when set.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self.global_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ if self.username.trim().is_empty() => PLACEHOLDER_USER_NAME,
            _ => &self.username,
        }
    }

    /// `name#1234` for legacy accounts, `@name` otherwise.
    #[must_use]
    pub fn tag(&self) -> String {
        let name = if self.username.trim().is_empty() {
            PLACEHOLDER_USER_NAME
        } else {
            &self.username
        };
        match self.discriminator.as_deref() {
            Some(disc) if !disc.is_empty() && disc != "0" => format!("{name}#{disc}"),
            _ => format!("@{name}"),
        }
    }

    /// Whether this participant may be counted as a human poster.
    #[must_use]
    pub fn is_human(&self) -> bool {
        !self.bot && !self.is_placeholder()
    }
}

/// The channel an event happened in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_name: Option<String>,
    /// Category the channel sits under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundAttachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// A newly created message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub channel: ChannelInfo,
    /// `None` when the platform could not resolve the author.
    #[serde(default)]
    pub author: Option<Participant>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<InboundAttachment>,
    /// Raw embed objects, kept as JSON so image URLs can be mined from any field.
    #[serde(default)]
    pub embeds: Vec<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    /// The message this one replies to or forwards, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced: Option<Box<InboundMessage>>,
}

impl InboundMessage {
    #[must_use]
    pub fn author_or_placeholder(&self) -> Participant {
        self.author.clone().unwrap_or_else(Participant::placeholder)
    }
}

/// A message update. Any field the platform omitted is `None`/empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEdit {
    pub message_id: String,
    pub channel: ChannelInfo,
    #[serde(default)]
    pub author: Option<Participant>,
    /// Content before the edit, when the platform cache still had it.
    #[serde(default)]
    pub old_content: Option<String>,
    /// Content after the edit; `None` for embed-only updates.
    #[serde(default)]
    pub new_content: Option<String>,
    #[serde(default)]
    pub attachments: Vec<InboundAttachment>,
    #[serde(default)]
    pub embeds: Vec<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub edited_at: DateTime<Utc>,
}

/// A message deletion. Content and author are only present when cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundDelete {
    pub message_id: String,
    pub channel: ChannelInfo,
    #[serde(default)]
    pub author: Option<Participant>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub attachments: Vec<InboundAttachment>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub deleted_at: DateTime<Utc>,
}
