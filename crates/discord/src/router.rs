//! Drives ticket ledgers from inbound channel events.
//!
//! The store sits behind a `std::sync::Mutex` that is never held across an
//! `.await`: each handler does its synchronous ledger work, drops the lock,
//! awaits the member lookup or the delivery, then locks again and looks the
//! ledger up afresh. A channel closed in the meantime simply has no ledger
//! any more.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use {
    chrono::{DateTime, Utc},
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, info, warn},
};

use {
    ticketlog_channels::{
        ChannelInfo, InboundDelete, InboundEdit, InboundMessage, MemberDirectory, Participant,
        gating::is_ticket_channel,
    },
    ticketlog_transcripts::{
        LedgerStore, Rank, RankTable, TicketLedger,
        classify::{Classification, classify_member},
        render_ledger, ticket_id, transcript_filename,
    },
    ticketlog_webhook::{
        Embed, FileUpload, WebhookPayload, WebhookTransport,
        embed::{EmbedField, message_embeds},
    },
};

/// Everything the ticket engine needs from configuration.
#[derive(Debug, Clone)]
pub struct TicketSettings {
    pub category_ids: Vec<String>,
    pub name_patterns: Vec<String>,
    pub rank_table: RankTable,
    pub webhook_url: Secret<String>,
    pub embed_color: u32,
    /// Post the uploaded transcript's URL in a follow-up message.
    pub notify_transcript_url: bool,
    pub lookup_timeout: Duration,
}

/// Routes message and channel events of ticket channels into their ledgers
/// and ships the one-time summary and the closure transcript.
pub struct ChannelEventRouter {
    settings: TicketSettings,
    directory: Arc<dyn MemberDirectory>,
    transport: Arc<dyn WebhookTransport>,
    store: Mutex<LedgerStore>,
}

impl ChannelEventRouter {
    pub fn new(
        settings: TicketSettings,
        directory: Arc<dyn MemberDirectory>,
        transport: Arc<dyn WebhookTransport>,
    ) -> Self {
        Self {
            settings,
            directory,
            transport,
            store: Mutex::new(LedgerStore::new()),
        }
    }

    fn store(&self) -> MutexGuard<'_, LedgerStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether events of `channel` belong to a ticket: the channel matches
    /// the configured scope, or a ledger is already open for it.
    pub fn tracks(&self, channel: &ChannelInfo) -> bool {
        if self.store().is_disposed(&channel.id) {
            return false;
        }
        is_ticket_channel(
            channel,
            &self.settings.category_ids,
            &self.settings.name_patterns,
        ) || self.store().get(&channel.id).is_some()
    }

    /// Read access to a live ledger.
    pub fn with_ledger<R>(
        &self,
        channel_id: &str,
        f: impl FnOnce(&TicketLedger) -> R,
    ) -> Option<R> {
        self.store().get(channel_id).map(f)
    }

    pub fn is_disposed(&self, channel_id: &str) -> bool {
        self.store().is_disposed(channel_id)
    }

    async fn classify(&self, guild_id: Option<&str>, author: &Participant) -> Classification {
        classify_member(
            self.directory.as_ref(),
            guild_id,
            author,
            &self.settings.rank_table,
            self.settings.lookup_timeout,
        )
        .await
    }

    /// A message was posted.
    ///
    /// The record is upserted before the author lookup so its place in the
    /// transcript is its arrival position. The summary goes out at most
    /// once per channel: the first unprivileged human to finish
    /// classification claims it under the lock.
    pub async fn on_message_created(&self, message: &InboundMessage) {
        let channel_id = message.channel.id.as_str();
        let Some(applied) = self.store().record_message(message, None) else {
            debug!(channel_id, message_id = %message.id, "ticket already closed, message ignored");
            return;
        };
        debug!(
            channel_id,
            message_id = %message.id,
            transition = ?applied.transition,
            "ticket message recorded"
        );

        let author = message.author_or_placeholder();
        let classification = self
            .classify(message.channel.guild_id.as_deref(), &author)
            .await;
        let rank = classification.rank;

        let summary = {
            let mut store = self.store();
            let Some(ledger) = store.get_mut(channel_id) else {
                debug!(channel_id, "ticket closed during member lookup");
                return;
            };
            if ledger.classify_message(&message.id, classification) {
                info!(channel_id, opener = %author.id, "ticket opener identified");
            }
            if rank != Rank::Unprivileged || !author.is_human() || !ledger.claim_report() {
                return;
            }
            self.summary_payload(ledger, message)
        };

        match self
            .transport
            .send_json(self.settings.webhook_url.expose_secret(), &summary)
            .await
        {
            Ok(()) => info!(channel_id, "ticket summary sent"),
            Err(e) => warn!(channel_id, error = %e, "failed to send ticket summary"),
        }
    }

    fn summary_payload(&self, ledger: &TicketLedger, message: &InboundMessage) -> WebhookPayload {
        let meta = ledger.meta();
        let mut mentions: Vec<String> = Vec::new();
        if let Some(opener) = meta.opener() {
            mentions.push(opener.id.clone());
        }
        mentions.extend(ledger.participants().iter().cloned());

        let mut content = format!("Ticket {} opened", ticket_id(&meta.channel_name));
        if let Some(opener) = meta.opener() {
            content.push_str(&format!(" by <@{}>", opener.id));
        }
        let others: Vec<String> = ledger
            .participants()
            .iter()
            .filter(|id| meta.opener().is_none_or(|o| o.id != **id))
            .map(|id| format!("<@{id}>"))
            .collect();
        if !others.is_empty() {
            content.push_str(&format!("\nParticipants: {}", others.join(" ")));
        }

        let color = self.settings.embed_color;
        WebhookPayload::new(content)
            .mentioning(mentions)
            .with_embeds(message_embeds(message, "", color), color)
    }

    /// A message was edited. A record missing from the ledger is
    /// synthesized from the update's payload.
    pub async fn on_message_edited(&self, edit: &InboundEdit) {
        let channel_id = edit.channel.id.as_str();
        let Some(applied) = self.store().record_edit(edit) else {
            debug!(
                channel_id,
                message_id = %edit.message_id,
                "ticket already closed, edit ignored"
            );
            return;
        };
        debug!(
            channel_id,
            message_id = %edit.message_id,
            synthesized = applied.synthesized,
            transition = ?applied.transition,
            "ticket edit applied"
        );
        if applied.synthesized {
            let author = edit.author.clone().unwrap_or_else(Participant::placeholder);
            self.classify_synthesized(&edit.channel, &edit.message_id, &author)
                .await;
        }
    }

    /// A message was deleted. A record missing from the ledger is
    /// synthesized from whatever the event carried, then flagged.
    pub async fn on_message_deleted(&self, delete: &InboundDelete) {
        let channel_id = delete.channel.id.as_str();
        let Some(applied) = self.store().record_delete(delete) else {
            debug!(
                channel_id,
                message_id = %delete.message_id,
                "ticket already closed, delete ignored"
            );
            return;
        };
        debug!(
            channel_id,
            message_id = %delete.message_id,
            synthesized = applied.synthesized,
            transition = ?applied.transition,
            "ticket delete applied"
        );
        if applied.synthesized {
            let author = delete
                .author
                .clone()
                .unwrap_or_else(Participant::placeholder);
            self.classify_synthesized(&delete.channel, &delete.message_id, &author)
                .await;
        }
    }

    async fn classify_synthesized(
        &self,
        channel: &ChannelInfo,
        message_id: &str,
        author: &Participant,
    ) {
        let classification = self.classify(channel.guild_id.as_deref(), author).await;
        if let Some(ledger) = self.store().get_mut(&channel.id) {
            ledger.classify_message(message_id, classification);
        }
    }

    /// The channel was deleted: close its ledger, render the transcript and
    /// upload it. The ledger is discarded whether or not the upload
    /// succeeds, and the channel can never be tracked again.
    pub async fn on_channel_destroyed(&self, channel_id: &str, closed_at: DateTime<Utc>) {
        let ledger = {
            let mut store = self.store();
            store.close_ledger(channel_id, closed_at);
            store.dispose(channel_id)
        };
        let Some(ledger) = ledger else {
            debug!(channel_id, "no ledger for destroyed channel");
            return;
        };
        info!(
            channel_id,
            messages = ledger.order().len(),
            participants = ledger.participants().len(),
            "ticket closed, ledger disposed"
        );

        let filename = transcript_filename(ledger.meta());
        let upload = FileUpload::html(filename.clone(), render_ledger(&ledger));
        let payload = self.transcript_payload(&ledger);
        let url = self.settings.webhook_url.expose_secret();

        let delivered = match self.transport.send_file(url, &payload, upload).await {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!(
                    channel_id,
                    filename = %filename,
                    error = %e,
                    "failed to deliver transcript, transcript lost"
                );
                return;
            },
        };
        info!(channel_id, filename = %filename, "transcript delivered");

        if !self.settings.notify_transcript_url {
            return;
        }
        let Some(link) = delivered.attachment_urls.first() else {
            debug!(channel_id, "destination returned no attachment url");
            return;
        };
        let follow_up = WebhookPayload::new(format!(
            "Transcript of #{}: {link}",
            ledger.meta().channel_name
        ));
        if let Err(e) = self.transport.send_json(url, &follow_up).await {
            warn!(channel_id, error = %e, "failed to send transcript link");
        }
    }

    fn transcript_payload(&self, ledger: &TicketLedger) -> WebhookPayload {
        let meta = ledger.meta();
        let opener = meta.opener().map_or_else(
            || "unknown".to_string(),
            |o| format!("{} (<@{}>)", o.name, o.id),
        );
        let field = |name: &str, value: String| EmbedField {
            name: name.into(),
            value,
            inline: true,
        };
        let embed = Embed {
            color: Some(self.settings.embed_color),
            description: Some(format!("Transcript of #{}", meta.channel_name)),
            fields: vec![
                field("Ticket", ticket_id(&meta.channel_name).to_string()),
                field("Opened by", opener),
                field("Messages", ledger.order().len().to_string()),
                field("Participants", ledger.participants().len().to_string()),
            ],
            ..Default::default()
        };
        WebhookPayload::new(String::new()).with_embeds(vec![embed], self.settings.embed_color)
    }
}
