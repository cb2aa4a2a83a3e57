//! Discord event handler for serenity.
//!
//! Translates gateway events into the inbound contracts and hands them to
//! the ticket router and the relay.

use std::sync::Arc;

use {
    chrono::Utc,
    serenity::{
        all::{
            ChannelId, Context, EventHandler, GatewayIntents, GuildChannel, GuildId, Message,
            MessageId, MessageUpdateEvent, Ready,
        },
        async_trait,
    },
    tracing::{debug, info},
};

use crate::{convert, relay::MessageRelay, router::ChannelEventRouter};

/// Handler for Discord gateway events.
pub struct TicketlogHandler {
    pub router: Option<Arc<ChannelEventRouter>>,
    pub relay: Option<Arc<MessageRelay>>,
}

impl TicketlogHandler {
    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
    }
}

#[async_trait]
impl EventHandler for TicketlogHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            tickets = self.router.is_some(),
            relay = self.relay.is_some(),
            "discord bot ready"
        );
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.guild_id.is_none() {
            return;
        }
        let inbound = convert::inbound_message(&ctx.cache, &msg);

        if let Some(router) = &self.router
            && router.tracks(&inbound.channel)
        {
            router.on_message_created(&inbound).await;
        }
        if let Some(relay) = &self.relay
            && relay.accepts(&inbound.channel)
        {
            relay.relay(&inbound).await;
        }
    }

    async fn message_update(
        &self,
        ctx: Context,
        old_if_available: Option<Message>,
        _new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        let Some(router) = &self.router else {
            return;
        };
        let edit = convert::inbound_edit(&ctx.cache, old_if_available.as_ref(), &event);
        if router.tracks(&edit.channel) {
            router.on_message_edited(&edit).await;
        }
    }

    async fn message_delete(
        &self,
        ctx: Context,
        channel_id: ChannelId,
        deleted_message_id: MessageId,
        guild_id: Option<GuildId>,
    ) {
        let Some(router) = &self.router else {
            return;
        };
        let delete = convert::inbound_delete(&ctx.cache, channel_id, deleted_message_id, guild_id);
        if router.tracks(&delete.channel) {
            router.on_message_deleted(&delete).await;
        }
    }

    async fn channel_delete(
        &self,
        ctx: Context,
        channel: GuildChannel,
        _messages: Option<Vec<Message>>,
    ) {
        let Some(router) = &self.router else {
            return;
        };
        let info = convert::guild_channel_info(&ctx.cache, &channel);
        if !router.tracks(&info) {
            debug!(channel_id = %info.id, "untracked channel deleted");
            return;
        }
        router.on_channel_destroyed(&info.id, Utc::now()).await;
    }
}
