//! Outbound webhook delivery: embed building and the HTTP transport.

pub mod embed;
pub mod error;
pub mod payload;
pub mod transport;

pub use {
    embed::{Embed, MAX_EMBEDS, truncate_embeds},
    error::{Error, Result},
    payload::{AllowedMentions, FileUpload, WebhookPayload},
    transport::{DeliveredMessage, HttpWebhook, WebhookTransport},
};
