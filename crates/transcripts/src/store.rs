//! Owner of every live ticket ledger, keyed by channel id.

use std::collections::{HashMap, HashSet};

use {
    chrono::{DateTime, Utc},
    tracing::debug,
};

use ticketlog_channels::{ChannelInfo, InboundDelete, InboundEdit, InboundMessage};

use crate::{
    classify::Classification,
    ledger::{Applied, ObservedMessage, TicketLedger},
};

/// In-memory ledgers for open ticket channels.
///
/// A channel's ledger is created lazily on its first event and disposed
/// after closure. Disposed channels are remembered so a straggling event
/// cannot bring the ledger back.
#[derive(Debug, Default)]
pub struct LedgerStore {
    ledgers: HashMap<String, TicketLedger>,
    disposed: HashSet<String>,
}

impl LedgerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the ledger for `channel`, creating it if needed. `None` once the
    /// channel has been disposed.
    pub fn get_or_create(
        &mut self,
        channel: &ChannelInfo,
        first_seen: DateTime<Utc>,
    ) -> Option<&mut TicketLedger> {
        if self.disposed.contains(&channel.id) {
            return None;
        }
        Some(
            self.ledgers
                .entry(channel.id.clone())
                .or_insert_with(|| {
                    debug!(channel_id = %channel.id, channel = %channel.name, "ticket ledger created");
                    TicketLedger::new(channel, first_seen)
                }),
        )
    }

    pub fn get(&self, channel_id: &str) -> Option<&TicketLedger> {
        self.ledgers.get(channel_id)
    }

    pub fn get_mut(&mut self, channel_id: &str) -> Option<&mut TicketLedger> {
        self.ledgers.get_mut(channel_id)
    }

    /// Upsert a created message. Fixes its place in `order` immediately.
    pub fn record_message(
        &mut self,
        message: &InboundMessage,
        classification: Option<Classification>,
    ) -> Option<Applied> {
        let ledger = self.get_or_create(&message.channel, message.created_at)?;
        Some(ledger.record_message(ObservedMessage::from(message), classification))
    }

    pub fn record_edit(&mut self, edit: &InboundEdit) -> Option<Applied> {
        let first_seen = edit.created_at.unwrap_or(edit.edited_at);
        let ledger = self.get_or_create(&edit.channel, first_seen)?;
        Some(ledger.record_edit(edit))
    }

    pub fn record_delete(&mut self, delete: &InboundDelete) -> Option<Applied> {
        let first_seen = delete.created_at.unwrap_or(delete.deleted_at);
        let ledger = self.get_or_create(&delete.channel, first_seen)?;
        Some(ledger.record_delete(delete))
    }

    /// Stamp closure on an existing ledger. The ledger stays readable until
    /// [`LedgerStore::dispose`].
    pub fn close_ledger(
        &mut self,
        channel_id: &str,
        closed_at: DateTime<Utc>,
    ) -> Option<&TicketLedger> {
        let ledger = self.ledgers.get_mut(channel_id)?;
        ledger.close(closed_at);
        Some(ledger)
    }

    /// Drop a channel's ledger for good.
    pub fn dispose(&mut self, channel_id: &str) -> Option<TicketLedger> {
        self.disposed.insert(channel_id.to_string());
        let ledger = self.ledgers.remove(channel_id);
        debug!(channel_id, had_ledger = ledger.is_some(), "ticket ledger disposed");
        ledger
    }

    pub fn is_disposed(&self, channel_id: &str) -> bool {
        self.disposed.contains(channel_id)
    }

    pub fn len(&self) -> usize {
        self.ledgers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledgers.is_empty()
    }
}
