//! Ticket lifecycle and transcript engine.
//!
//! Classifies participants against a rank table, accumulates every message
//! of a ticket channel (edits and deletions included) in a [`TicketLedger`],
//! and renders the closed ledger into a standalone HTML transcript.

pub mod classify;
pub mod ledger;
pub mod render;
pub mod store;

pub use {
    classify::{Classification, Rank, RankEntry, RankTable, RankTableError, classify},
    ledger::{Applied, MessageRecord, ObservedMessage, TicketLedger, Transition, VisualState},
    render::{render, render_ledger, ticket_id, transcript_filename},
    store::LedgerStore,
};
