//! Serenity models to the platform-neutral inbound contracts.

use {
    chrono::{DateTime, Utc},
    serenity::{
        all::{
            Attachment, ChannelId, GuildChannel, GuildId, Message, MessageId, MessageUpdateEvent,
            Timestamp, User,
        },
        cache::Cache,
    },
};

use ticketlog_channels::{
    ChannelInfo, InboundAttachment, InboundDelete, InboundEdit, InboundMessage, Participant,
};

pub fn timestamp(ts: Timestamp) -> DateTime<Utc> {
    DateTime::from_timestamp(ts.unix_timestamp(), 0).unwrap_or_else(Utc::now)
}

pub fn participant(user: &User) -> Participant {
    Participant {
        id: user.id.to_string(),
        username: user.name.clone(),
        discriminator: user.discriminator.map(|d| format!("{:04}", d.get())),
        global_name: user.global_name.clone(),
        avatar_url: user.avatar_url(),
        bot: user.bot,
    }
}

pub fn attachments(list: &[Attachment]) -> Vec<InboundAttachment> {
    list.iter()
        .map(|a| InboundAttachment {
            name: Some(a.filename.clone()),
            url: a.url.clone(),
            content_type: a.content_type.clone(),
        })
        .collect()
}

pub fn embeds(list: &[serenity::all::Embed]) -> Vec<serde_json::Value> {
    list.iter()
        .filter_map(|e| serde_json::to_value(e).ok())
        .collect()
}

fn guild_name(cache: &Cache, guild_id: GuildId) -> Option<String> {
    cache.guild(guild_id).map(|g| g.name.clone())
}

/// Channel metadata from the cache. A cache miss still yields the ids.
pub fn channel_info(
    cache: &Cache,
    channel_id: ChannelId,
    guild_id: Option<GuildId>,
) -> ChannelInfo {
    let cached = cache.channel(channel_id).map(|c| GuildChannel::clone(&c));
    if let Some(channel) = cached {
        return guild_channel_info(cache, &channel);
    }
    ChannelInfo {
        id: channel_id.to_string(),
        guild_id: guild_id.map(|g| g.to_string()),
        guild_name: guild_id.and_then(|g| guild_name(cache, g)),
        created_at: Some(timestamp(channel_id.created_at())),
        ..Default::default()
    }
}

pub fn guild_channel_info(cache: &Cache, channel: &GuildChannel) -> ChannelInfo {
    ChannelInfo {
        id: channel.id.to_string(),
        name: channel.name.clone(),
        guild_id: Some(channel.guild_id.to_string()),
        guild_name: guild_name(cache, channel.guild_id),
        parent_id: channel.parent_id.map(|p| p.to_string()),
        created_at: Some(timestamp(channel.id.created_at())),
    }
}

fn message_in(channel: ChannelInfo, msg: &Message) -> InboundMessage {
    InboundMessage {
        id: msg.id.to_string(),
        channel,
        author: Some(participant(&msg.author)),
        content: msg.content.clone(),
        attachments: attachments(&msg.attachments),
        embeds: embeds(&msg.embeds),
        created_at: timestamp(msg.timestamp),
        referenced: None,
    }
}

/// A created message, with the message it replies to when the gateway
/// included it.
pub fn inbound_message(cache: &Cache, msg: &Message) -> InboundMessage {
    let channel = channel_info(cache, msg.channel_id, msg.guild_id);
    let referenced = msg.referenced_message.as_deref().map(|r| {
        let ref_channel = if r.channel_id == msg.channel_id {
            channel.clone()
        } else {
            channel_info(cache, r.channel_id, r.guild_id.or(msg.guild_id))
        };
        Box::new(message_in(ref_channel, r))
    });
    InboundMessage {
        referenced,
        ..message_in(channel, msg)
    }
}

/// An update. `old` is the cached pre-update message, if any.
pub fn inbound_edit(
    cache: &Cache,
    old: Option<&Message>,
    event: &MessageUpdateEvent,
) -> InboundEdit {
    InboundEdit {
        message_id: event.id.to_string(),
        channel: channel_info(cache, event.channel_id, event.guild_id),
        author: event
            .author
            .as_ref()
            .or(old.map(|m| &m.author))
            .map(participant),
        old_content: old.map(|m| m.content.clone()),
        new_content: event.content.clone(),
        attachments: event
            .attachments
            .as_deref()
            .map(attachments)
            .unwrap_or_default(),
        embeds: event.embeds.as_deref().map(embeds).unwrap_or_default(),
        created_at: event.timestamp.map(timestamp),
        edited_at: event.edited_timestamp.map_or_else(Utc::now, timestamp),
    }
}

/// A deletion. The gateway carries only ids; the creation time is
/// recovered from the message snowflake.
pub fn inbound_delete(
    cache: &Cache,
    channel_id: ChannelId,
    message_id: MessageId,
    guild_id: Option<GuildId>,
) -> InboundDelete {
    InboundDelete {
        message_id: message_id.to_string(),
        channel: channel_info(cache, channel_id, guild_id),
        author: None,
        content: None,
        attachments: Vec::new(),
        created_at: Some(timestamp(message_id.created_at())),
        deleted_at: Utc::now(),
    }
}
