//! Closure-time HTML transcript of a ticket ledger.
//!
//! The output is a single self-contained document: styles are inlined and
//! nothing is fetched at view time except the attachment URLs themselves.
//! Every piece of ledger text goes through [`escape_html`]; URLs go through
//! [`safe_url`] before landing in an attribute.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::{
    classify::{Rank, UNPRIVILEGED_LABEL},
    ledger::{LedgerMeta, MessageRecord, TicketLedger, VisualState},
};

const STYLE: &str = r#"
body{margin:0;background:#313338;color:#dbdee1;font:15px/1.4 "gg sans","Helvetica Neue",Helvetica,Arial,sans-serif}
header{padding:20px 24px;background:#2b2d31;border-bottom:1px solid #1e1f22}
header h1{margin:0 0 8px;font-size:20px;color:#f2f3f5}
header dl{display:grid;grid-template-columns:max-content 1fr;gap:2px 16px;margin:0}
header dt{color:#949ba4}
header dd{margin:0}
ol.messages{list-style:none;margin:0;padding:12px 24px}
li.msg{padding:8px 0;border-bottom:1px solid #3f4147}
.meta{font-size:13px;color:#949ba4}
.author{font-weight:600;color:#f2f3f5}
.rank{margin-left:6px;padding:0 6px;border-radius:4px;font-size:11px;background:#4e5058;color:#fff}
.rank-higher{background:#da373c}
.rank-baseline{background:#5865f2}
.content{margin-top:4px;white-space:normal;word-wrap:break-word}
.msg-deleted .content{color:#a0a3a8;text-decoration:line-through}
.badge{display:inline-block;margin-top:4px;font-size:12px;font-weight:600}
.badge-deleted{color:#f23f43}
.badge-edited{color:#f0b232}
.edit-pair{margin-top:4px;padding:6px 10px;border-left:3px solid #f0b232;background:#2b2d31;font-size:13px}
.edit-pair .label{color:#949ba4;margin-right:6px}
.attachments{margin:6px 0 0;padding:0 0 0 18px}
.images img{display:block;max-width:420px;max-height:320px;margin-top:6px;border-radius:4px}
.empty{color:#949ba4;font-style:italic}
"#;

/// Escape text for HTML element content and quoted attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escaped URL for use in `href`/`src`, or `None` for non-http(s) schemes.
#[must_use]
pub fn safe_url(url: &str) -> Option<String> {
    let trimmed = url.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("https://") || lower.starts_with("http://") {
        Some(escape_html(trimmed))
    } else {
        None
    }
}

/// Ticket identifier derived from a channel name: its trailing run of ASCII
/// digits, or the whole name when it does not end in one.
#[must_use]
pub fn ticket_id(channel_name: &str) -> &str {
    let digits = channel_name
        .bytes()
        .rev()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        channel_name
    } else {
        &channel_name[channel_name.len() - digits..]
    }
}

/// `transcript-<ticketId>-<channelId>.html`, with filename-hostile
/// characters replaced.
#[must_use]
pub fn transcript_filename(meta: &LedgerMeta) -> String {
    let clean = |s: &str| -> String {
        s.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    };
    format!(
        "transcript-{}-{}.html",
        clean(ticket_id(&meta.channel_name)),
        clean(&meta.channel_id)
    )
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn text_block(text: &str) -> String {
    if text.trim().is_empty() {
        return r#"<span class="empty">(no text)</span>"#.to_string();
    }
    escape_html(text).replace('\n', "<br>")
}

/// Render the transcript of a whole ledger in `order` sequence.
#[must_use]
pub fn render_ledger(ledger: &TicketLedger) -> String {
    render(ledger.meta(), &ledger.ordered_records())
}

/// Render channel metadata and records (already in display order) into an
/// HTML document. Pure: equal inputs give byte-identical output.
#[must_use]
pub fn render(meta: &LedgerMeta, records: &[&MessageRecord]) -> String {
    let mut html = String::with_capacity(4096 + records.len() * 512);
    let ticket = ticket_id(&meta.channel_name);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(
        html,
        "<title>Ticket {} · #{}</title>",
        escape_html(ticket),
        escape_html(&meta.channel_name)
    );
    let _ = writeln!(html, "<style>{STYLE}</style>\n</head>\n<body>");
    render_header(&mut html, meta, ticket, records.len());

    html.push_str("<ol class=\"messages\">\n");
    for record in records {
        render_record(&mut html, record);
    }
    html.push_str("</ol>\n</body>\n</html>\n");
    html
}

fn render_header(html: &mut String, meta: &LedgerMeta, ticket: &str, count: usize) {
    let opener = meta.opener().map_or_else(
        || r#"<span class="empty">unknown</span>"#.to_string(),
        |o| format!("{} ({})", escape_html(&o.name), escape_html(&o.id)),
    );
    let closed = meta.closed_at.map_or_else(
        || r#"<span class="empty">still open</span>"#.to_string(),
        format_ts,
    );

    html.push_str("<header>\n");
    let _ = writeln!(html, "<h1>Ticket {}</h1>", escape_html(ticket));
    html.push_str("<dl>\n");
    let _ = writeln!(
        html,
        "<dt>Channel</dt><dd>#{} ({})</dd>",
        escape_html(&meta.channel_name),
        escape_html(&meta.channel_id)
    );
    if let Some(guild) = &meta.guild_name {
        let _ = writeln!(html, "<dt>Server</dt><dd>{}</dd>", escape_html(guild));
    }
    let _ = writeln!(html, "<dt>Opened by</dt><dd>{opener}</dd>");
    let _ = writeln!(html, "<dt>Created</dt><dd>{}</dd>", format_ts(meta.created_at));
    let _ = writeln!(html, "<dt>Closed</dt><dd>{closed}</dd>");
    let _ = writeln!(html, "<dt>Messages</dt><dd>{count}</dd>");
    html.push_str("</dl>\n</header>\n");
}

fn rank_badge(record: &MessageRecord) -> String {
    let (class, label) = match record.classification() {
        Some(c) => {
            let class = match c.rank {
                Rank::Unprivileged => "rank",
                Rank::BaselinePrivileged => "rank rank-baseline",
                Rank::HigherPrivileged => "rank rank-higher",
            };
            (class, c.label.as_str())
        },
        None => ("rank", UNPRIVILEGED_LABEL),
    };
    let bot = if record.author_bot() {
        r#"<span class="rank">BOT</span>"#
    } else {
        ""
    };
    format!(
        r#"<span class="{class}">{}</span>{bot}"#,
        escape_html(label)
    )
}

fn render_record(html: &mut String, record: &MessageRecord) {
    let state = record.visual_state();
    let state_class = match state {
        VisualState::Deleted => "msg-deleted",
        VisualState::Edited => "msg-edited",
        VisualState::Plain => "msg-plain",
    };

    let _ = writeln!(
        html,
        r#"<li class="msg {state_class}" id="m-{}">"#,
        escape_html(record.id())
    );
    let _ = writeln!(
        html,
        r#"<div class="meta"><span class="author" title="{}">{}</span>{} · <time>{}</time></div>"#,
        escape_html(record.author_id()),
        escape_html(record.author_name()),
        rank_badge(record),
        format_ts(record.created_at())
    );
    let _ = writeln!(
        html,
        r#"<div class="content">{}</div>"#,
        text_block(record.content_current())
    );

    match state {
        VisualState::Deleted => {
            let when = record
                .deleted_at()
                .map(|ts| format!(" · {}", format_ts(ts)))
                .unwrap_or_default();
            let _ = writeln!(
                html,
                r#"<div class="badge badge-deleted">[DELETED]{when}</div>"#
            );
        },
        VisualState::Edited => {
            if let Some(edit) = record.last_edit() {
                let _ = writeln!(
                    html,
                    r#"<div class="edit-pair"><div><span class="label">Before</span>{}</div><div><span class="label">After</span>{}</div></div>"#,
                    text_block(&edit.old_content),
                    text_block(&edit.new_content)
                );
                let _ = writeln!(
                    html,
                    r#"<div class="badge badge-edited">[EDITED] · {} · {} edit(s)</div>"#,
                    format_ts(edit.edited_at),
                    record.edits().len()
                );
            }
        },
        VisualState::Plain => {},
    }

    render_attachments(html, record);
    html.push_str("</li>\n");
}

fn render_attachments(html: &mut String, record: &MessageRecord) {
    let (images, files): (Vec<_>, Vec<_>) =
        record.attachments().iter().partition(|a| a.is_image);

    let images: Vec<String> = images
        .iter()
        .filter_map(|img| {
            safe_url(&img.url)
                .map(|url| format!(r#"<img src="{url}" alt="{}">"#, escape_html(&img.name)))
        })
        .collect();
    if !images.is_empty() {
        let _ = writeln!(html, r#"<div class="images">{}</div>"#, images.concat());
    }

    if !files.is_empty() {
        html.push_str("<ul class=\"attachments\">");
        for file in files {
            match safe_url(&file.url) {
                Some(url) => {
                    let _ = write!(
                        html,
                        r#"<li><a href="{url}" rel="noopener noreferrer">{}</a></li>"#,
                        escape_html(&file.name)
                    );
                },
                None => {
                    let _ = write!(html, "<li>{}</li>", escape_html(&file.name));
                },
            }
        }
        html.push_str("</ul>\n");
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            classify::Classification,
            ledger::{ObservedMessage, TicketLedger},
        },
        chrono::TimeZone,
        rstest::rstest,
        ticketlog_channels::{
            ChannelInfo, InboundDelete, InboundEdit, Participant, media::MediaRef,
        },
    };

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn channel() -> ChannelInfo {
        ChannelInfo {
            id: "900".into(),
            name: "ticket-0042".into(),
            guild_id: Some("1".into()),
            guild_name: Some("Acme".into()),
            parent_id: None,
            created_at: None,
        }
    }

    fn person(id: &str, name: &str) -> Participant {
        Participant {
            id: id.into(),
            username: name.into(),
            discriminator: None,
            global_name: None,
            avatar_url: None,
            bot: false,
        }
    }

    fn sample_ledger() -> TicketLedger {
        let mut ledger = TicketLedger::new(&channel(), at(0));
        ledger.record_message(
            ObservedMessage {
                id: "m1".into(),
                author: person("7", "pat"),
                content: "hello".into(),
                media: vec![
                    MediaRef {
                        name: "shot.png".into(),
                        url: "https://cdn.test/shot.png".into(),
                        is_image: true,
                    },
                    MediaRef {
                        name: "log.txt".into(),
                        url: "https://cdn.test/log.txt".into(),
                        is_image: false,
                    },
                ],
                created_at: at(1),
            },
            Some(Classification::unprivileged()),
        );
        ledger.record_message(
            ObservedMessage {
                id: "m2".into(),
                author: person("5", "sam"),
                content: "<b>staff</b>".into(),
                media: Vec::new(),
                created_at: at(2),
            },
            Some(Classification {
                rank: Rank::BaselinePrivileged,
                label: "Support".into(),
            }),
        );
        ledger.record_edit(&InboundEdit {
            message_id: "m1".into(),
            channel: channel(),
            author: None,
            old_content: None,
            new_content: Some("hello world".into()),
            attachments: Vec::new(),
            embeds: Vec::new(),
            created_at: None,
            edited_at: at(3),
        });
        ledger.record_delete(&InboundDelete {
            message_id: "m2".into(),
            channel: channel(),
            author: None,
            content: None,
            attachments: Vec::new(),
            created_at: None,
            deleted_at: at(4),
        });
        ledger.close(at(5));
        ledger
    }

    #[rstest]
    #[case("ticket-0042", "0042")]
    #[case("support-12-7", "7")]
    #[case("general", "general")]
    #[case("123", "123")]
    #[case("", "")]
    fn ticket_id_from_name(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(ticket_id(name), expected);
    }

    #[test]
    fn escape_covers_attribute_breakers() {
        assert_eq!(
            escape_html(r#"<a href="x" onclick='y'>&</a>"#),
            "&lt;a href=&quot;x&quot; onclick=&#39;y&#39;&gt;&amp;&lt;/a&gt;"
        );
    }

    #[test]
    fn unsafe_urls_are_rejected() {
        assert!(safe_url("javascript:alert(1)").is_none());
        assert_eq!(
            safe_url("https://x.test/?a=1&b=2").as_deref(),
            Some("https://x.test/?a=1&amp;b=2")
        );
    }

    #[test]
    fn filename_uses_ticket_and_channel() {
        let ledger = sample_ledger();
        assert_eq!(
            transcript_filename(ledger.meta()),
            "transcript-0042-900.html"
        );
    }

    #[test]
    fn header_lists_ticket_channel_and_opener() {
        let html = render_ledger(&sample_ledger());
        assert!(html.contains("<h1>Ticket 0042</h1>"));
        assert!(html.contains("#ticket-0042 (900)"));
        assert!(html.contains("<dt>Opened by</dt><dd>pat (7)</dd>"));
        assert!(html.contains("2023-11-14 22:13:25 UTC"));
    }

    #[test]
    fn records_render_in_order_with_one_state_each() {
        let html = render_ledger(&sample_ledger());
        let first = html.find(r#"id="m-m1""#).unwrap();
        let second = html.find(r#"id="m-m2""#).unwrap();
        assert!(first < second);

        let m1 = &html[first..second];
        assert!(m1.contains("msg-edited"));
        assert!(m1.contains("[EDITED]"));
        assert!(m1.contains("<span class=\"label\">Before</span>hello</div>"));
        assert!(m1.contains("<span class=\"label\">After</span>hello world</div>"));
        assert!(!m1.contains("[DELETED]"));

        let m2 = &html[second..];
        assert!(m2.contains("msg-deleted"));
        assert!(m2.contains("[DELETED] · 2023-11-14 22:13:24 UTC"));
        assert!(m2.contains("&lt;b&gt;staff&lt;/b&gt;"));
        assert!(!m2.contains("<b>staff</b>"));
        assert!(!m2.contains("[EDITED]"));
    }

    #[test]
    fn attachments_render_as_images_and_links() {
        let html = render_ledger(&sample_ledger());
        assert!(html.contains(r#"<img src="https://cdn.test/shot.png" alt="shot.png">"#));
        assert!(html.contains(r#"<a href="https://cdn.test/log.txt" rel="noopener noreferrer">log.txt</a>"#));
    }

    #[test]
    fn rendering_is_idempotent_and_pure() {
        let ledger = sample_ledger();
        let before = ledger.order().to_vec();
        let first = render_ledger(&ledger);
        let second = render_ledger(&ledger);
        assert_eq!(first, second);
        assert_eq!(ledger.order(), before.as_slice());
    }

    #[test]
    fn open_ledger_without_opener() {
        let ledger = TicketLedger::new(&channel(), at(0));
        let html = render_ledger(&ledger);
        assert!(html.contains("still open"));
        assert!(html.contains("<dd>0</dd>"));
        assert!(html.contains(r#"<dt>Opened by</dt><dd><span class="empty">unknown</span></dd>"#));
    }
}
