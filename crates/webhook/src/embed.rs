//! Embed model and the builders that turn a chat message into embeds.

use {
    chrono::{DateTime, SecondsFormat, Utc},
    serde::{Deserialize, Serialize},
};

use ticketlog_channels::{
    ChannelInfo, InboundAttachment, InboundMessage, Participant, media::collect_media,
};

/// Most embeds a single webhook request may carry.
pub const MAX_EMBEDS: usize = 10;

/// Longest embed description accepted by the destination.
pub const MAX_DESCRIPTION_LEN: usize = 4096;

/// Description of the synthetic embed appended when embeds are cut.
pub const TRUNCATED_NOTICE: &str = "Reached the limit of 10 embeds. (Content truncated)";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    /// ISO-8601 timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
}

impl Embed {
    #[must_use]
    pub fn image(url: impl Into<String>, color: u32) -> Self {
        Self {
            color: Some(color),
            image: Some(EmbedImage { url: url.into() }),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn text(description: impl Into<String>, color: u32) -> Self {
        Self {
            color: Some(color),
            description: Some(description.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedImage {
    pub url: String,
}

/// A non-image attachment, listed as a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLink {
    pub name: String,
    pub url: String,
}

/// Cap an embed list at [`MAX_EMBEDS`]: keep the first nine and append a
/// truncation notice.
#[must_use]
pub fn truncate_embeds(mut embeds: Vec<Embed>, color: u32) -> Vec<Embed> {
    if embeds.len() <= MAX_EMBEDS {
        return embeds;
    }
    embeds.truncate(MAX_EMBEDS - 1);
    embeds.push(Embed::text(TRUNCATED_NOTICE, color));
    embeds
}

/// Split text into pieces of at most `max_chars` characters.
#[must_use]
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() || max_chars == 0 {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Jump link to a message.
#[must_use]
pub fn message_link(guild_id: &str, channel_id: &str, message_id: &str) -> String {
    format!("https://discord.com/channels/{guild_id}/{channel_id}/{message_id}")
}

/// Image embeds and file links for a message's attachments and embeds.
#[must_use]
pub fn collect_embeds_and_files(
    attachments: &[InboundAttachment],
    embeds: &[serde_json::Value],
    color: u32,
) -> (Vec<Embed>, Vec<FileLink>) {
    let mut images = Vec::new();
    let mut files = Vec::new();
    for media in collect_media(attachments, embeds) {
        if media.is_image {
            images.push(Embed::image(media.url, color));
        } else {
            files.push(FileLink {
                name: media.name,
                url: media.url,
            });
        }
    }
    (images, files)
}

/// Inputs of [`build_primary_embeds`].
pub struct PrimaryEmbedInput<'a> {
    pub author: &'a Participant,
    pub content: &'a str,
    pub channel: &'a ChannelInfo,
    pub created_at: DateTime<Utc>,
    pub link: &'a str,
    pub files: &'a [FileLink],
    /// Shown before the author tag, e.g. `"Reply to"`. Empty for none.
    pub title_prefix: &'a str,
    pub color: u32,
}

/// Text embeds for one message: a head embed with author, footer and
/// timestamp, followed by description-only embeds for overflow.
#[must_use]
pub fn build_primary_embeds(input: &PrimaryEmbedInput<'_>) -> Vec<Embed> {
    let mut blocks: Vec<String> = Vec::new();
    let content = input.content.trim();
    if !content.is_empty() {
        blocks.push(content.to_string());
    }
    if !input.files.is_empty() {
        let list: Vec<String> = input
            .files
            .iter()
            .map(|f| format!("• [{}]({})", f.name, f.url))
            .collect();
        blocks.push(format!("**Files:**\n{}", list.join("\n")));
    }
    blocks.push(format!("[Jump to message]({})", input.link));

    let mut chunks = chunk_text(&blocks.join("\n\n"), MAX_DESCRIPTION_LEN).into_iter();

    let author_name = if input.title_prefix.is_empty() {
        format!("{} ({})", input.author.tag(), input.author.id)
    } else {
        format!(
            "{} · {} ({})",
            input.title_prefix,
            input.author.tag(),
            input.author.id
        )
    };
    let footer = format!(
        "#{} • {}",
        if input.channel.name.is_empty() {
            "unknown"
        } else {
            input.channel.name.as_str()
        },
        input.channel.guild_name.as_deref().unwrap_or("Unknown")
    );

    let head = Embed {
        color: Some(input.color),
        author: Some(EmbedAuthor {
            name: author_name,
            icon_url: input.author.avatar_url.clone(),
        }),
        description: Some(chunks.next().unwrap_or_else(|| "(no content)".into())),
        footer: Some(EmbedFooter { text: footer }),
        timestamp: Some(
            input
                .created_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
        ..Default::default()
    };

    let mut out = vec![head];
    out.extend(chunks.map(|chunk| Embed::text(chunk, input.color)));
    out
}

/// Primary embeds followed by image embeds for one message.
#[must_use]
pub fn message_embeds(message: &InboundMessage, title_prefix: &str, color: u32) -> Vec<Embed> {
    let author = message.author_or_placeholder();
    let (images, files) = collect_embeds_and_files(&message.attachments, &message.embeds, color);
    let link = message_link(
        message.channel.guild_id.as_deref().unwrap_or("@me"),
        &message.channel.id,
        &message.id,
    );
    let mut out = build_primary_embeds(&PrimaryEmbedInput {
        author: &author,
        content: &message.content,
        channel: &message.channel,
        created_at: message.created_at,
        link: &link,
        files: &files,
        title_prefix,
        color,
    });
    out.extend(images);
    out
}

#[cfg(test)]
mod tests {
    use {super::*, chrono::TimeZone, rstest::rstest, serde_json::json};

    fn author() -> Participant {
        Participant {
            id: "7".into(),
            username: "pat".into(),
            discriminator: None,
            global_name: None,
            avatar_url: Some("https://cdn.test/avatar.png".into()),
            bot: false,
        }
    }

    fn channel() -> ChannelInfo {
        ChannelInfo {
            id: "900".into(),
            name: "ticket-0042".into(),
            guild_id: Some("1".into()),
            guild_name: Some("Acme".into()),
            ..Default::default()
        }
    }

    fn numbered(n: usize) -> Vec<Embed> {
        (0..n).map(|i| Embed::text(format!("e{i}"), 1)).collect()
    }

    #[test]
    fn thirteen_embeds_truncate_to_ten() {
        let out = truncate_embeds(numbered(13), 0xff0000);
        assert_eq!(out.len(), MAX_EMBEDS);
        for (i, embed) in out.iter().take(9).enumerate() {
            assert_eq!(embed.description.as_deref(), Some(format!("e{i}").as_str()));
        }
        assert_eq!(out[9].description.as_deref(), Some(TRUNCATED_NOTICE));
        assert_eq!(out[9].color, Some(0xff0000));
    }

    #[rstest]
    #[case(0)]
    #[case(9)]
    #[case(10)]
    fn small_lists_are_untouched(#[case] n: usize) {
        assert_eq!(truncate_embeds(numbered(n), 1), numbered(n));
    }

    #[test]
    fn chunk_text_splits_on_char_count() {
        assert!(chunk_text("", 4096).is_empty());
        let text = "é".repeat(5000);
        let chunks = chunk_text(&text, MAX_DESCRIPTION_LEN);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 4096);
        assert_eq!(chunks[1].chars().count(), 904);
    }

    #[test]
    fn link_format() {
        assert_eq!(
            message_link("1", "2", "3"),
            "https://discord.com/channels/1/2/3"
        );
    }

    #[test]
    fn primary_embed_layout() {
        let files = vec![FileLink {
            name: "log.txt".into(),
            url: "https://cdn.test/log.txt".into(),
        }];
        let embeds = build_primary_embeds(&PrimaryEmbedInput {
            author: &author(),
            content: "  need help  ",
            channel: &channel(),
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            link: "https://discord.com/channels/1/900/5",
            files: &files,
            title_prefix: "",
            color: 42,
        });
        assert_eq!(embeds.len(), 1);
        let head = &embeds[0];
        assert_eq!(head.author.as_ref().unwrap().name, "@pat (7)");
        assert_eq!(
            head.description.as_deref(),
            Some(
                "need help\n\n**Files:**\n• [log.txt](https://cdn.test/log.txt)\n\n[Jump to message](https://discord.com/channels/1/900/5)"
            )
        );
        assert_eq!(head.footer.as_ref().unwrap().text, "#ticket-0042 • Acme");
        assert_eq!(head.timestamp.as_deref(), Some("2023-11-14T22:13:20.000Z"));
    }

    #[test]
    fn long_content_overflows_into_extra_embeds() {
        let content = "x".repeat(9000);
        let embeds = build_primary_embeds(&PrimaryEmbedInput {
            author: &author(),
            content: &content,
            channel: &channel(),
            created_at: Utc.timestamp_opt(0, 0).unwrap(),
            link: "l",
            files: &[],
            title_prefix: "Reply to",
            color: 1,
        });
        assert_eq!(embeds.len(), 3);
        assert!(
            embeds[0]
                .author
                .as_ref()
                .unwrap()
                .name
                .starts_with("Reply to · @pat")
        );
        assert!(embeds[1].author.is_none());
        assert!(embeds[2].description.as_ref().unwrap().ends_with("(l)"));
    }

    #[test]
    fn message_embeds_append_images_after_text() {
        let message = InboundMessage {
            id: "5".into(),
            channel: channel(),
            author: Some(author()),
            content: "see".into(),
            attachments: vec![InboundAttachment {
                name: Some("a.png".into()),
                url: "https://cdn.test/a.png".into(),
                content_type: Some("image/png".into()),
            }],
            embeds: vec![json!({ "thumbnail": { "url": "https://cdn.test/b.jpg" } })],
            created_at: Utc.timestamp_opt(0, 0).unwrap(),
            referenced: None,
        };
        let embeds = message_embeds(&message, "", 3);
        assert_eq!(embeds.len(), 3);
        assert_eq!(
            embeds[1].image.as_ref().map(|i| i.url.as_str()),
            Some("https://cdn.test/a.png")
        );
        assert_eq!(
            embeds[2].image.as_ref().map(|i| i.url.as_str()),
            Some("https://cdn.test/b.jpg")
        );
    }

    #[test]
    fn absent_parts_are_not_serialized() {
        let value = serde_json::to_value(Embed::image("https://cdn.test/a.png", 5)).unwrap();
        assert_eq!(
            value,
            json!({ "color": 5, "image": { "url": "https://cdn.test/a.png" } })
        );
    }
}
