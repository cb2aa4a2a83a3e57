//! Per-channel message history and the lifecycle of each tracked message.
//!
//! A [`MessageRecord`] moves through `Created → Edited* → Deleted?`. It is
//! created either from a live create event ([`MessageRecord::created`]) or,
//! when the create was never seen, from whatever an edit or delete event
//! carried ([`MessageRecord::synthesize_from_partial`]). Records are never
//! removed from a ledger; deletion only flags them.

use std::collections::HashMap;

use {
    chrono::{DateTime, Utc},
    serde::Serialize,
};

use ticketlog_channels::{
    ChannelInfo, InboundDelete, InboundEdit, InboundMessage, Participant,
    media::{MediaRef, collect_media},
};

use crate::classify::{Classification, Rank};

/// One content change of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditRecord {
    pub old_content: String,
    pub new_content: String,
    pub edited_at: DateTime<Utc>,
}

/// How a record is presented in a transcript. Exactly one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualState {
    Deleted,
    Edited,
    Plain,
}

/// Result of applying an event to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A new record entered `order`.
    Created,
    /// Content changed; one edit entry appended.
    Edited,
    /// The event carried nothing new.
    Unchanged,
    /// The record was flagged deleted.
    Deleted,
    /// The record is deleted; the event was dropped.
    Ignored,
}

/// A message as the ledger sees it on first observation.
#[derive(Debug, Clone)]
pub struct ObservedMessage {
    pub id: String,
    pub author: Participant,
    pub content: String,
    pub media: Vec<MediaRef>,
    pub created_at: DateTime<Utc>,
}

impl From<&InboundMessage> for ObservedMessage {
    fn from(msg: &InboundMessage) -> Self {
        Self {
            id: msg.id.clone(),
            author: msg.author_or_placeholder(),
            content: msg.content.clone(),
            media: collect_media(&msg.attachments, &msg.embeds),
            created_at: msg.created_at,
        }
    }
}

impl ObservedMessage {
    /// Partial view of a message whose create event was missed, taken from
    /// an edit. The pre-edit content is preferred as the original.
    #[must_use]
    pub fn from_edit(edit: &InboundEdit) -> Self {
        Self {
            id: edit.message_id.clone(),
            author: edit.author.clone().unwrap_or_else(Participant::placeholder),
            content: edit
                .old_content
                .clone()
                .or_else(|| edit.new_content.clone())
                .unwrap_or_default(),
            media: collect_media(&edit.attachments, &edit.embeds),
            created_at: edit.created_at.unwrap_or(edit.edited_at),
        }
    }

    /// Partial view of a message whose create event was missed, taken from
    /// a delete.
    #[must_use]
    pub fn from_delete(delete: &InboundDelete) -> Self {
        Self {
            id: delete.message_id.clone(),
            author: delete
                .author
                .clone()
                .unwrap_or_else(Participant::placeholder),
            content: delete.content.clone().unwrap_or_default(),
            media: collect_media(&delete.attachments, &[]),
            created_at: delete.created_at.unwrap_or(delete.deleted_at),
        }
    }
}

/// Everything known about one message in a ticket channel.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRecord {
    id: String,
    author_id: String,
    author_name: String,
    author_bot: bool,
    classification: Option<Classification>,
    created_at: DateTime<Utc>,
    content_original: String,
    content_current: String,
    attachments: Vec<MediaRef>,
    edits: Vec<EditRecord>,
    deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
    synthesized: bool,
}

impl MessageRecord {
    /// `Created` from a live create event.
    #[must_use]
    pub fn created(observed: ObservedMessage) -> Self {
        Self::from_observed(observed, false)
    }

    /// `Created` from an edit or delete whose create was never observed.
    /// The original content is seeded from the partial payload.
    #[must_use]
    pub fn synthesize_from_partial(observed: ObservedMessage) -> Self {
        Self::from_observed(observed, true)
    }

    fn from_observed(observed: ObservedMessage, synthesized: bool) -> Self {
        Self {
            id: observed.id,
            author_id: observed.author.id.clone(),
            author_name: observed.author.display_name().to_string(),
            author_bot: observed.author.bot,
            classification: None,
            created_at: observed.created_at,
            content_original: observed.content.clone(),
            content_current: observed.content,
            attachments: dedupe_media(observed.media),
            edits: Vec::new(),
            deleted: false,
            deleted_at: None,
            synthesized,
        }
    }

    /// `Edited` self-transition. Content-preserving edits and edits to a
    /// deleted record append nothing.
    pub fn apply_edit(&mut self, new_content: &str, edited_at: DateTime<Utc>) -> Transition {
        if self.deleted {
            return Transition::Ignored;
        }
        if self.content_current == new_content {
            return Transition::Unchanged;
        }
        self.edits.push(EditRecord {
            old_content: std::mem::replace(&mut self.content_current, new_content.to_string()),
            new_content: new_content.to_string(),
            edited_at,
        });
        Transition::Edited
    }

    /// Terminal `Deleted` transition. The first deletion time is kept.
    pub fn mark_deleted(&mut self, deleted_at: DateTime<Utc>) -> Transition {
        if self.deleted {
            return Transition::Unchanged;
        }
        self.deleted = true;
        self.deleted_at = Some(deleted_at);
        Transition::Deleted
    }

    /// Append attachments not already listed. Returns how many were added.
    pub fn merge_attachments(&mut self, media: &[MediaRef]) -> usize {
        let before = self.attachments.len();
        for item in media {
            if !self.attachments.iter().any(|a| a.url == item.url) {
                self.attachments.push(item.clone());
            }
        }
        self.attachments.len() - before
    }

    pub fn set_classification(&mut self, classification: Classification) {
        self.classification = Some(classification);
    }

    #[must_use]
    pub fn visual_state(&self) -> VisualState {
        if self.deleted {
            VisualState::Deleted
        } else if !self.edits.is_empty() {
            VisualState::Edited
        } else {
            VisualState::Plain
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn author_id(&self) -> &str {
        &self.author_id
    }

    pub fn author_name(&self) -> &str {
        &self.author_name
    }

    pub fn author_bot(&self) -> bool {
        self.author_bot
    }

    pub fn classification(&self) -> Option<&Classification> {
        self.classification.as_ref()
    }

    /// Rank, or `None` while the author's lookup is still in flight.
    pub fn rank(&self) -> Option<Rank> {
        self.classification.as_ref().map(|c| c.rank)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn content_original(&self) -> &str {
        &self.content_original
    }

    pub fn content_current(&self) -> &str {
        &self.content_current
    }

    pub fn attachments(&self) -> &[MediaRef] {
        &self.attachments
    }

    pub fn edits(&self) -> &[EditRecord] {
        &self.edits
    }

    pub fn last_edit(&self) -> Option<&EditRecord> {
        self.edits.last()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Whether the record was rebuilt from an edit/delete payload.
    pub fn is_synthesized(&self) -> bool {
        self.synthesized
    }
}

fn dedupe_media(media: Vec<MediaRef>) -> Vec<MediaRef> {
    let mut out: Vec<MediaRef> = Vec::with_capacity(media.len());
    for item in media {
        if !out.iter().any(|m| m.url == item.url) {
            out.push(item);
        }
    }
    out
}

/// The participant who opened the ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Opener {
    pub id: String,
    pub name: String,
}

/// Channel-level metadata.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerMeta {
    pub channel_id: String,
    pub channel_name: String,
    pub guild_name: Option<String>,
    /// Earliest timestamp observed for the channel.
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    opener: Option<Opener>,
}

impl LedgerMeta {
    pub fn opener(&self) -> Option<&Opener> {
        self.opener.as_ref()
    }
}

/// Outcome of an upsert, edit or delete on a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    /// The record did not exist and was synthesized from this event.
    pub synthesized: bool,
    pub transition: Transition,
}

/// Accumulated history of one ticket channel.
#[derive(Debug, Clone)]
pub struct TicketLedger {
    meta: LedgerMeta,
    messages: HashMap<String, MessageRecord>,
    order: Vec<String>,
    participants: Vec<String>,
    reported: bool,
}

impl TicketLedger {
    #[must_use]
    pub fn new(channel: &ChannelInfo, first_seen: DateTime<Utc>) -> Self {
        let created_at = channel
            .created_at
            .map_or(first_seen, |created| created.min(first_seen));
        Self {
            meta: LedgerMeta {
                channel_id: channel.id.clone(),
                channel_name: channel.name.clone(),
                guild_name: channel.guild_name.clone(),
                created_at,
                closed_at: None,
                opener: None,
            },
            messages: HashMap::new(),
            order: Vec::new(),
            participants: Vec::new(),
            reported: false,
        }
    }

    /// Idempotent upsert of a message. Establishes its position in `order`
    /// the first time it is seen and accumulates attachments after that.
    pub fn record_message(
        &mut self,
        observed: ObservedMessage,
        classification: Option<Classification>,
    ) -> Applied {
        let message_id = observed.id.clone();
        let author = observed.author.clone();
        let applied = if let Some(record) = self.messages.get_mut(&message_id) {
            record.merge_attachments(&observed.media);
            Applied {
                synthesized: false,
                transition: Transition::Unchanged,
            }
        } else {
            self.insert(MessageRecord::created(observed));
            Applied {
                synthesized: false,
                transition: Transition::Created,
            }
        };

        self.note_participant(&author);
        if let Some(classification) = classification {
            self.classify_message(&message_id, classification);
        }
        applied
    }

    /// Store the author's classification on a record and, for the first
    /// human unprivileged poster, stamp the opener. Returns `true` when the
    /// opener was stamped by this call.
    pub fn classify_message(&mut self, message_id: &str, classification: Classification) -> bool {
        let rank = classification.rank;
        let Some(record) = self.messages.get_mut(message_id) else {
            return false;
        };
        record.set_classification(classification);

        let eligible = rank == Rank::Unprivileged
            && !record.author_bot
            && record.author_id != ticketlog_channels::contracts::PLACEHOLDER_USER_ID;
        if eligible && self.meta.opener.is_none() {
            self.meta.opener = Some(Opener {
                id: record.author_id.clone(),
                name: record.author_name.clone(),
            });
            return true;
        }
        false
    }

    /// Apply an edit event, synthesizing the record when its create was
    /// missed.
    pub fn record_edit(&mut self, edit: &InboundEdit) -> Applied {
        let synthesized =
            self.ensure_record(&edit.message_id, || ObservedMessage::from_edit(edit));
        let media = collect_media(&edit.attachments, &edit.embeds);

        let Some(record) = self.messages.get_mut(&edit.message_id) else {
            return Applied {
                synthesized,
                transition: Transition::Ignored,
            };
        };
        let transition = match edit.new_content.as_deref() {
            Some(content) => record.apply_edit(content, edit.edited_at),
            None if record.is_deleted() => Transition::Ignored,
            None => Transition::Unchanged,
        };
        // Late embed unfurls arrive as updates with unchanged content.
        if transition != Transition::Ignored {
            record.merge_attachments(&media);
        }
        Applied {
            synthesized,
            transition,
        }
    }

    /// Apply a delete event, synthesizing the record when its create was
    /// missed.
    pub fn record_delete(&mut self, delete: &InboundDelete) -> Applied {
        let synthesized =
            self.ensure_record(&delete.message_id, || ObservedMessage::from_delete(delete));
        let transition = match self.messages.get_mut(&delete.message_id) {
            Some(record) => record.mark_deleted(delete.deleted_at),
            None => Transition::Ignored,
        };
        Applied {
            synthesized,
            transition,
        }
    }

    /// Stamp the closure time. Later calls keep the first stamp.
    pub fn close(&mut self, closed_at: DateTime<Utc>) {
        if self.meta.closed_at.is_none() {
            self.meta.closed_at = Some(closed_at);
        }
    }

    /// Claim the one-time summary. Only the first call returns `true`.
    pub fn claim_report(&mut self) -> bool {
        if self.reported {
            return false;
        }
        self.reported = true;
        true
    }

    pub fn is_reported(&self) -> bool {
        self.reported
    }

    pub fn meta(&self) -> &LedgerMeta {
        &self.meta
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Human posters in first-seen order.
    pub fn participants(&self) -> &[String] {
        &self.participants
    }

    pub fn record(&self, message_id: &str) -> Option<&MessageRecord> {
        self.messages.get(message_id)
    }

    /// Records in first-observed order.
    pub fn ordered_records(&self) -> Vec<&MessageRecord> {
        self.order
            .iter()
            .filter_map(|id| self.messages.get(id))
            .collect()
    }

    fn ensure_record(
        &mut self,
        message_id: &str,
        partial: impl FnOnce() -> ObservedMessage,
    ) -> bool {
        if self.messages.contains_key(message_id) {
            return false;
        }
        let observed = partial();
        let author = observed.author.clone();
        self.insert(MessageRecord::synthesize_from_partial(observed));
        self.note_participant(&author);
        true
    }

    fn insert(&mut self, record: MessageRecord) {
        if record.created_at < self.meta.created_at {
            self.meta.created_at = record.created_at;
        }
        self.order.push(record.id.clone());
        self.messages.insert(record.id.clone(), record);
    }

    fn note_participant(&mut self, author: &Participant) {
        if author.is_human() && !self.participants.iter().any(|p| *p == author.id) {
            self.participants.push(author.id.clone());
        }
    }
}
