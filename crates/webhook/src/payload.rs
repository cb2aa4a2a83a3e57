use serde::Serialize;

use crate::embed::{Embed, truncate_embeds};

/// Which mentions in `content` may ping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllowedMentions {
    pub users: Vec<String>,
}

/// JSON body of a webhook request.
///
/// The embed list is capped on construction, so a built payload never
/// carries more than [`crate::MAX_EMBEDS`] embeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WebhookPayload {
    pub content: String,
    pub allowed_mentions: AllowedMentions,
    embeds: Vec<Embed>,
}

impl WebhookPayload {
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Allow pings for these users only. Duplicates are dropped, first
    /// occurrence wins.
    #[must_use]
    pub fn mentioning<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for user in users {
            let user = user.into();
            if !out.contains(&user) {
                out.push(user);
            }
        }
        self.allowed_mentions.users = out;
        self
    }

    /// Attach embeds, truncating to the request limit. `color` tints the
    /// truncation notice if one is added.
    #[must_use]
    pub fn with_embeds(mut self, embeds: Vec<Embed>, color: u32) -> Self {
        self.embeds = truncate_embeds(embeds, color);
        self
    }

    pub fn embeds(&self) -> &[Embed] {
        &self.embeds
    }
}

/// A file sent alongside a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    #[must_use]
    pub fn html(filename: impl Into<String>, document: String) -> Self {
        Self {
            filename: filename.into(),
            content_type: "text/html; charset=utf-8".into(),
            bytes: document.into_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn serializes_to_webhook_shape() {
        let payload = WebhookPayload::new("<@7>")
            .mentioning(["7", "8", "7"])
            .with_embeds(vec![Embed::text("hi", 1)], 1);
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "content": "<@7>",
                "allowed_mentions": { "users": ["7", "8"] },
                "embeds": [{ "color": 1, "description": "hi" }],
            })
        );
    }

    #[test]
    fn embeds_are_capped() {
        let embeds = (0..13).map(|i| Embed::text(i.to_string(), 1)).collect();
        let payload = WebhookPayload::new("").with_embeds(embeds, 9);
        assert_eq!(payload.embeds().len(), crate::MAX_EMBEDS);
        assert_eq!(payload.embeds()[8].description.as_deref(), Some("8"));
    }
}
