use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
};

/// Default embed color (Discord blurple).
pub const DEFAULT_EMBED_COLOR: u32 = 0x5865F2;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TicketlogConfig {
    pub discord: DiscordConfig,
    pub tickets: TicketsConfig,
    pub relay: RelayConfig,
}

/// Gateway connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token.
    pub token: Secret<String>,
    /// Member lookup timeout.
    pub lookup_timeout_ms: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            lookup_timeout_ms: 5_000,
        }
    }
}

/// One rank table row, most privileged first in the list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RankConfig {
    pub role_id: String,
    pub key: String,
    pub label: String,
}

/// Ticket transcript engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TicketsConfig {
    /// Categories holding ticket channels. Empty means any category.
    pub category_ids: Vec<String>,
    /// Channel name patterns (`*` wildcard), e.g. `ticket-*`.
    pub name_patterns: Vec<String>,
    /// Ordered privilege table, most privileged first.
    pub ranks: Vec<RankConfig>,
    /// Role marking the lowest staff rank. Must appear in `ranks`.
    pub baseline_role_id: String,
    /// Destination for summaries and transcripts.
    pub webhook_url: Secret<String>,
    pub embed_color: u32,
    /// Post the transcript's URL in a follow-up message after upload.
    pub notify_transcript_url: bool,
}

impl Default for TicketsConfig {
    fn default() -> Self {
        Self {
            category_ids: Vec::new(),
            name_patterns: vec!["ticket-*".into()],
            ranks: Vec::new(),
            baseline_role_id: String::new(),
            webhook_url: Secret::new(String::new()),
            embed_color: DEFAULT_EMBED_COLOR,
            notify_transcript_url: true,
        }
    }
}

impl TicketsConfig {
    /// The engine runs only with a destination to deliver to.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.webhook_url.expose_secret().trim().is_empty()
    }
}

/// One-shot forwarding of messages from monitored channels.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub channel_ids: Vec<String>,
    /// When set, relayed channels must also sit under this category.
    pub category_id: Option<String>,
    /// Authors holding any of these roles are not relayed.
    pub ignore_role_ids: Vec<String>,
    pub webhook_url: Secret<String>,
    pub embed_color: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            channel_ids: Vec::new(),
            category_id: None,
            ignore_role_ids: Vec::new(),
            webhook_url: Secret::new(String::new()),
            embed_color: DEFAULT_EMBED_COLOR,
        }
    }
}

impl RelayConfig {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.channel_ids.is_empty() && !self.webhook_url.expose_secret().trim().is_empty()
    }
}
