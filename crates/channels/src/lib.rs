//! Platform-neutral contracts between the chat connection and the ticket engine.
//!
//! The gateway adapter translates platform events into the shapes defined
//! here; everything downstream (ledger, renderer, webhook builders) only
//! ever sees these types.

pub mod contracts;
pub mod directory;
pub mod error;
pub mod gating;
pub mod media;

pub use {
    contracts::{
        ChannelInfo, InboundAttachment, InboundDelete, InboundEdit, InboundMessage, Participant,
    },
    directory::MemberDirectory,
    error::{Error, Result},
};
