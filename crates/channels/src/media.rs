//! Image and file discovery on inbound messages.

use std::sync::LazyLock;

use {regex::Regex, serde::Serialize, serde_json::Value};

use crate::contracts::InboundAttachment;

static IMAGE_EXT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\.(png|jpe?g|gif|webp|bmp|tiff)$").ok());

static CDN_IMAGE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(https?://(?:media|cdn)\.discordapp\.(?:net|com)/[^\s"']+\.(?:png|jpe?g|gif|webp|bmp|tiff))"#,
    )
    .ok()
});

/// One attachment or embedded image discovered on a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaRef {
    pub name: String,
    pub url: String,
    pub is_image: bool,
}

/// Whether the URL path ends in a known image extension. Query strings and
/// fragments are ignored.
#[must_use]
pub fn is_image_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    IMAGE_EXT.as_ref().is_some_and(|re| re.is_match(path))
}

#[must_use]
pub fn is_image_attachment(att: &InboundAttachment) -> bool {
    let content_type = att.content_type.as_deref().unwrap_or_default();
    content_type.to_ascii_lowercase().starts_with("image/") || is_image_url(&att.url)
}

/// Image URLs hidden anywhere inside a raw embed object.
///
/// The well-known image/thumbnail/video/url fields are checked first, then
/// the serialized JSON is scanned for CDN image links. First-seen order,
/// duplicates dropped.
#[must_use]
pub fn extract_image_urls(embed: &Value) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    let mut push = |url: &str| {
        if !urls.iter().any(|u| u == url) {
            urls.push(url.to_string());
        }
    };

    let direct = [
        embed.pointer("/image/url"),
        embed.pointer("/thumbnail/url"),
        embed.pointer("/video/url"),
        embed.get("url"),
    ];
    for url in direct.into_iter().flatten().filter_map(Value::as_str) {
        if is_image_url(url) {
            push(url);
        }
    }

    if let Some(re) = CDN_IMAGE.as_ref() {
        let raw = embed.to_string();
        for cap in re.captures_iter(&raw) {
            if let Some(m) = cap.get(1) {
                push(m.as_str());
            }
        }
    }

    urls
}

/// Attachments in order, followed by images mined from embeds.
#[must_use]
pub fn collect_media(attachments: &[InboundAttachment], embeds: &[Value]) -> Vec<MediaRef> {
    let mut out: Vec<MediaRef> = attachments
        .iter()
        .map(|att| MediaRef {
            name: att
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "file".into()),
            url: att.url.clone(),
            is_image: is_image_attachment(att),
        })
        .collect();

    for url in embeds.iter().flat_map(extract_image_urls) {
        if out.iter().any(|m| m.url == url) {
            continue;
        }
        out.push(MediaRef {
            name: file_name_from_url(&url),
            url,
            is_image: true,
        });
    }
    out
}

fn file_name_from_url(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("image")
        .to_string()
}
