//! Discord connection for ticketlog: the ticket event router, the message
//! relay, and the serenity client that feeds them.

pub mod convert;
pub mod directory;
pub mod handler;
pub mod relay;
pub mod router;

use std::{sync::Arc, time::Duration};

use {
    anyhow::Context as _,
    secrecy::ExposeSecret,
    serenity::{Client, cache::Settings as CacheSettings, http::Http},
    tracing::{info, warn},
};

use {
    ticketlog_channels::MemberDirectory,
    ticketlog_config::TicketlogConfig,
    ticketlog_transcripts::{RankEntry, RankTable},
    ticketlog_webhook::{HttpWebhook, WebhookTransport},
};

pub use {
    directory::SerenityDirectory,
    handler::TicketlogHandler,
    relay::{MessageRelay, RelaySettings},
    router::{ChannelEventRouter, TicketSettings},
};

/// Messages kept per channel so edits can report the pre-edit content.
const CACHED_MESSAGES: usize = 500;

fn ticket_settings(config: &TicketlogConfig) -> anyhow::Result<Option<TicketSettings>> {
    let tickets = &config.tickets;
    if !tickets.is_enabled() {
        warn!("tickets.webhook_url is empty, ticket transcripts disabled");
        return Ok(None);
    }
    let entries = tickets
        .ranks
        .iter()
        .map(|r| RankEntry {
            role_id: r.role_id.clone(),
            key: r.key.clone(),
            label: r.label.clone(),
        })
        .collect();
    let rank_table = RankTable::new(entries, tickets.baseline_role_id.clone())
        .context("invalid tickets.ranks")?;
    Ok(Some(TicketSettings {
        category_ids: tickets.category_ids.clone(),
        name_patterns: tickets.name_patterns.clone(),
        rank_table,
        webhook_url: tickets.webhook_url.clone(),
        embed_color: tickets.embed_color,
        notify_transcript_url: tickets.notify_transcript_url,
        lookup_timeout: Duration::from_millis(config.discord.lookup_timeout_ms),
    }))
}

fn relay_settings(config: &TicketlogConfig) -> Option<RelaySettings> {
    let relay = &config.relay;
    if !relay.is_enabled() {
        return None;
    }
    Some(RelaySettings {
        channel_ids: relay.channel_ids.clone(),
        category_id: relay.category_id.clone(),
        ignore_role_ids: relay.ignore_role_ids.clone(),
        webhook_url: relay.webhook_url.clone(),
        embed_color: relay.embed_color,
        lookup_timeout: Duration::from_millis(config.discord.lookup_timeout_ms),
    })
}

/// Build the handler from configuration.
pub fn build_handler(
    config: &TicketlogConfig,
    directory: Arc<dyn MemberDirectory>,
    transport: Arc<dyn WebhookTransport>,
) -> anyhow::Result<TicketlogHandler> {
    let router = ticket_settings(config)?.map(|settings| {
        Arc::new(ChannelEventRouter::new(
            settings,
            Arc::clone(&directory),
            Arc::clone(&transport),
        ))
    });
    let relay = relay_settings(config)
        .map(|settings| Arc::new(MessageRelay::new(settings, directory, transport)));
    Ok(TicketlogHandler { router, relay })
}

/// Connect to the gateway and process events until the client stops.
pub async fn run(config: TicketlogConfig) -> anyhow::Result<()> {
    let token = config.discord.token.expose_secret().trim().to_string();
    if token.is_empty() {
        anyhow::bail!("discord.token is not set");
    }

    let http = Arc::new(Http::new(&token));
    let directory: Arc<dyn MemberDirectory> = Arc::new(SerenityDirectory::new(http));
    let transport: Arc<dyn WebhookTransport> = Arc::new(HttpWebhook::default());
    let handler = build_handler(&config, directory, transport)?;
    if handler.router.is_none() && handler.relay.is_none() {
        anyhow::bail!("nothing to do: neither tickets nor relay is configured");
    }

    let mut cache = CacheSettings::default();
    cache.max_messages = CACHED_MESSAGES;

    let mut client = Client::builder(&token, TicketlogHandler::intents())
        .event_handler(handler)
        .cache_settings(cache)
        .await
        .context("failed to build discord client")?;

    info!("connecting to discord gateway");
    client.start().await.context("discord client stopped")?;
    Ok(())
}
