//! Stateless one-shot forwarding of messages from monitored channels.

use std::{sync::Arc, time::Duration};

use {
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, info, warn},
};

use {
    ticketlog_channels::{ChannelInfo, InboundMessage, MemberDirectory, gating::is_relay_channel},
    ticketlog_transcripts::classify::{has_ignored_role, lookup_roles},
    ticketlog_webhook::{WebhookPayload, WebhookTransport, embed::message_embeds},
};

/// Author line prefix of the embeds describing a replied-to message.
pub const REPLY_PREFIX: &str = "Reply to";

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub channel_ids: Vec<String>,
    pub category_id: Option<String>,
    pub ignore_role_ids: Vec<String>,
    pub webhook_url: Secret<String>,
    pub embed_color: u32,
    pub lookup_timeout: Duration,
}

pub struct MessageRelay {
    settings: RelaySettings,
    directory: Arc<dyn MemberDirectory>,
    transport: Arc<dyn WebhookTransport>,
}

impl MessageRelay {
    pub fn new(
        settings: RelaySettings,
        directory: Arc<dyn MemberDirectory>,
        transport: Arc<dyn WebhookTransport>,
    ) -> Self {
        Self {
            settings,
            directory,
            transport,
        }
    }

    pub fn accepts(&self, channel: &ChannelInfo) -> bool {
        is_relay_channel(
            channel,
            &self.settings.channel_ids,
            self.settings.category_id.as_deref(),
        )
    }

    /// Whether the author holds an ignored role. A failed lookup counts as
    /// holding none.
    async fn author_is_ignored(&self, guild_id: &str, user_id: &str) -> bool {
        if self.settings.ignore_role_ids.is_empty() {
            return false;
        }
        let held = lookup_roles(
            self.directory.as_ref(),
            guild_id,
            user_id,
            self.settings.lookup_timeout,
        )
        .await
        .unwrap_or_default();
        has_ignored_role(&held, &self.settings.ignore_role_ids)
    }

    /// Forward one message: ping its author, then its embeds, its images,
    /// and those of the message it replies to.
    pub async fn relay(&self, message: &InboundMessage) {
        let Some(author) = message.author.as_ref().filter(|a| a.is_human()) else {
            return;
        };
        let Some(guild_id) = message.channel.guild_id.as_deref() else {
            return;
        };
        if !self.accepts(&message.channel) {
            return;
        }
        if self.author_is_ignored(guild_id, &author.id).await {
            debug!(user_id = %author.id, "author holds an ignored role, not relayed");
            return;
        }

        let color = self.settings.embed_color;
        let mut embeds = message_embeds(message, "", color);
        if let Some(reference) = &message.referenced {
            embeds.extend(message_embeds(reference, REPLY_PREFIX, color));
        }
        let payload = WebhookPayload::new(format!("<@{}>", author.id))
            .mentioning([author.id.clone()])
            .with_embeds(embeds, color);

        match self
            .transport
            .send_json(self.settings.webhook_url.expose_secret(), &payload)
            .await
        {
            Ok(()) => info!(
                user = %author.tag(),
                channel_id = %message.channel.id,
                "message relayed"
            ),
            Err(e) => warn!(
                channel_id = %message.channel.id,
                error = %e,
                "failed to relay message"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        chrono::{DateTime, TimeZone, Utc},
        rstest::rstest,
        std::sync::Mutex,
        ticketlog_channels::{InboundAttachment, Participant},
        ticketlog_webhook::{DeliveredMessage, FileUpload, MAX_EMBEDS},
    };

    const HOOK: &str = "https://hooks.test/api/webhooks/2/relay";
    const MUTED: &str = "77";

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    struct Roles(Option<Vec<String>>);

    #[async_trait]
    impl MemberDirectory for Roles {
        async fn role_ids(
            &self,
            guild_id: &str,
            user_id: &str,
        ) -> ticketlog_channels::Result<Vec<String>> {
            self.0
                .clone()
                .ok_or_else(|| ticketlog_channels::Error::unknown_member(guild_id, user_id))
        }
    }

    #[derive(Default)]
    struct Sent(Mutex<Vec<WebhookPayload>>);

    #[async_trait]
    impl WebhookTransport for Sent {
        async fn send_json(
            &self,
            url: &str,
            payload: &WebhookPayload,
        ) -> ticketlog_webhook::Result<()> {
            assert_eq!(url, HOOK);
            self.0.lock().unwrap().push(payload.clone());
            Ok(())
        }

        async fn send_file(
            &self,
            _url: &str,
            _payload: &WebhookPayload,
            _file: FileUpload,
        ) -> ticketlog_webhook::Result<DeliveredMessage> {
            unreachable!("relay never uploads files")
        }
    }

    fn channel(id: &str) -> ChannelInfo {
        ChannelInfo {
            id: id.into(),
            name: "general".into(),
            guild_id: Some("1".into()),
            guild_name: Some("Guild".into()),
            parent_id: Some("40".into()),
            created_at: None,
        }
    }

    fn author(bot: bool) -> Participant {
        Participant {
            id: "7".into(),
            username: "pat".into(),
            discriminator: None,
            global_name: None,
            avatar_url: None,
            bot,
        }
    }

    fn message(id: &str, content: &str) -> InboundMessage {
        InboundMessage {
            id: id.into(),
            channel: channel("10"),
            author: Some(author(false)),
            content: content.into(),
            attachments: Vec::new(),
            embeds: Vec::new(),
            created_at: at(0),
            referenced: None,
        }
    }

    fn relay(roles: Option<Vec<String>>) -> (MessageRelay, Arc<Sent>) {
        let sent = Arc::new(Sent::default());
        let relay = MessageRelay::new(
            RelaySettings {
                channel_ids: vec!["10".into()],
                category_id: Some("40".into()),
                ignore_role_ids: vec![MUTED.into()],
                webhook_url: Secret::new(HOOK.into()),
                embed_color: 0xff0000,
                lookup_timeout: Duration::from_secs(1),
            },
            Arc::new(Roles(roles)),
            Arc::clone(&sent) as Arc<dyn WebhookTransport>,
        );
        (relay, sent)
    }

    #[tokio::test]
    async fn relays_with_author_ping() {
        let (relay, sent) = relay(Some(vec![]));
        relay.relay(&message("m1", "hello")).await;

        let sent = sent.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].content, "<@7>");
        assert_eq!(sent[0].allowed_mentions.users, ["7"]);
        let head = &sent[0].embeds()[0];
        assert!(head.description.as_deref().unwrap().starts_with("hello"));
    }

    #[rstest]
    #[case::ignored_role(Some(vec![MUTED.to_string()]), false, "10", 0)]
    #[case::lookup_failure_relays(None, false, "10", 1)]
    #[case::bot_author(Some(vec![]), true, "10", 0)]
    #[case::unmonitored_channel(Some(vec![]), false, "11", 0)]
    #[tokio::test]
    async fn relay_filters(
        #[case] roles: Option<Vec<String>>,
        #[case] bot: bool,
        #[case] channel_id: &str,
        #[case] expected: usize,
    ) {
        let (relay, sent) = relay(roles);
        let mut msg = message("m1", "hi");
        msg.author = Some(author(bot));
        msg.channel = channel(channel_id);
        relay.relay(&msg).await;
        assert_eq!(sent.0.lock().unwrap().len(), expected);
    }

    #[tokio::test]
    async fn reply_embeds_follow_the_message() {
        let (relay, sent) = relay(Some(vec![]));
        let mut original = message("m0", "question");
        original.attachments = vec![InboundAttachment {
            name: Some("shot.png".into()),
            url: "https://cdn.test/shot.png".into(),
            content_type: Some("image/png".into()),
        }];
        let mut reply = message("m1", "answer");
        reply.referenced = Some(Box::new(original));
        relay.relay(&reply).await;

        let sent = sent.0.lock().unwrap();
        let embeds = sent[0].embeds();
        assert_eq!(embeds.len(), 3);
        assert!(embeds[0].description.as_deref().unwrap().starts_with("answer"));
        assert!(
            embeds[1]
                .author
                .as_ref()
                .unwrap()
                .name
                .starts_with(REPLY_PREFIX)
        );
        assert_eq!(
            embeds[2].image.as_ref().unwrap().url,
            "https://cdn.test/shot.png"
        );
    }

    #[tokio::test]
    async fn many_images_are_truncated() {
        let (relay, sent) = relay(Some(vec![]));
        let mut msg = message("m1", "gallery");
        msg.attachments = (0..12)
            .map(|i| InboundAttachment {
                name: None,
                url: format!("https://cdn.test/{i}.png"),
                content_type: None,
            })
            .collect();
        relay.relay(&msg).await;

        let sent = sent.0.lock().unwrap();
        let embeds = sent[0].embeds();
        assert_eq!(embeds.len(), MAX_EMBEDS);
        assert_eq!(
            embeds[MAX_EMBEDS - 1].description.as_deref(),
            Some(ticketlog_webhook::embed::TRUNCATED_NOTICE)
        );
    }
}
