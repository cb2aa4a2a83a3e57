//! Which channels the engine watches.

use crate::contracts::ChannelInfo;

/// Check a value against an allowlist.
///
/// An empty allowlist matches everything. Entries are compared
/// case-insensitively and may use `*` as a wildcard.
pub fn is_allowed(value: &str, allowlist: &[String]) -> bool {
    if allowlist.is_empty() {
        return true;
    }
    let value = value.to_lowercase();
    allowlist.iter().any(|pattern| {
        let pat = pattern.to_lowercase();
        if pat.contains('*') {
            glob_match(&pat, &value)
        } else {
            pat == value
        }
    })
}

/// Glob matching with `*` standing for any run of characters.
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }

    let mut pos = 0;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        match text[pos..].find(part) {
            Some(idx) => {
                if i == 0 && idx != 0 {
                    return false;
                }
                pos += idx + part.len();
            },
            None => return false,
        }
    }
    // A trailing literal must end the text.
    if parts.last().is_some_and(|last| !last.is_empty()) {
        pos == text.len()
    } else {
        true
    }
}

/// A ticket channel sits under one of `category_ids` and its name matches
/// one of `name_patterns`. Empty lists do not restrict.
pub fn is_ticket_channel(
    channel: &ChannelInfo,
    category_ids: &[String],
    name_patterns: &[String],
) -> bool {
    if channel.guild_id.is_none() {
        return false;
    }
    let in_category = category_ids.is_empty()
        || channel
            .parent_id
            .as_deref()
            .is_some_and(|parent| category_ids.iter().any(|c| c == parent));
    in_category && is_allowed(&channel.name, name_patterns)
}

/// Relay channels must be listed explicitly and, when a category is set,
/// sit under it.
pub fn is_relay_channel(
    channel: &ChannelInfo,
    channel_ids: &[String],
    category_id: Option<&str>,
) -> bool {
    if channel.guild_id.is_none() || !channel_ids.iter().any(|id| *id == channel.id) {
        return false;
    }
    match category_id.filter(|c| !c.is_empty()) {
        Some(category) => channel.parent_id.as_deref() == Some(category),
        None => true,
    }
}
