// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

//! Body transformation: turns the raw email body into forum markup, choosing
//! between the plain and HTML parts, stripping quoted-reply chrome and
//! signature boilerplate.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

use crate::modules::email::{InboundEmail, MessageType};
use crate::modules::markup;

/// Result of a body transformation. `used_html` reports the source actually
/// used, which may differ from what the caller asked for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RenderedBody {
    pub markup: String,
    pub used_html: bool,
}

static LINE_BREAK_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</p>|</div>|</tr>|</li>").unwrap());

static DROPPED_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<style\b.*?</style>|<script\b.*?</script>|<head\b.*?</head>").unwrap()
});

static QUOTE_INTRO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(on .{0,200}wrote:|-{2,}\s*original message\s*-{2,}|_{10,})\s*$").unwrap()
});

/// Renders the email body to forum markup, or `None` when nothing usable
/// remains — the caller records that as a missing message body.
///
/// HTML is preferred when present, except when `prefer_html` is off or the
/// HTML part carries two or more `<table` markers (mobile-client wrapper
/// markup that flattens badly) — then the plain body wins and `used_html`
/// flips to false. A declared legacy charset marks the body as lossily
/// transcoded and replacement characters are dropped.
pub fn render(email: &InboundEmail, prefer_html: bool) -> Option<RenderedBody> {
    let html_usable = email
        .html_body
        .as_deref()
        .is_some_and(|html| html.to_lowercase().matches("<table").count() < 2);

    let (source, used_html) = match email.html_body.as_deref() {
        Some(html) if prefer_html && html_usable => (flatten_html(html), true),
        _ => (scrub_plain(&email.plain_body), false),
    };

    let source = match email.charset.as_deref() {
        Some(cs) if !cs.eq_ignore_ascii_case("utf-8") && !cs.eq_ignore_ascii_case("us-ascii") => {
            source.replace('\u{FFFD}', "")
        }
        _ => source,
    };

    let markup = markup::to_markup(&source);
    let markup = strip_reply_noise(&markup, email.sender.name.as_deref());
    let markup = markup.trim();
    if markup.is_empty() {
        return None;
    }

    let markup = if email.message_type == MessageType::PmReply {
        markup.to_string()
    } else {
        markup::normalize(markup)
    };

    Some(RenderedBody { markup, used_html })
}

/// Flattens an HTML body to text: drops style/script/head blocks, maps
/// structural closers to line breaks, then extracts text nodes.
fn flatten_html(html: &str) -> String {
    let html = DROPPED_BLOCKS.replace_all(html, "");
    let html = LINE_BREAK_TAGS.replace_all(&html, "\n");
    let fragment = Html::parse_document(&html);
    let text: String = fragment.root_element().text().collect();
    scrub_plain(&text)
}

/// Removes control characters a mail client should never have produced,
/// keeping tabs and newlines.
fn scrub_plain(text: &str) -> String {
    text.replace("\r\n", "\n")
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Cuts quoted-reply chrome and signatures. Operates on markup text, so
/// quoted lines arrive entity-escaped (`&gt;`).
fn strip_reply_noise(text: &str, sender_name: Option<&str>) -> String {
    let mut kept: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();

        // Signature marker: everything below is boilerplate.
        if trimmed == "--" {
            break;
        }
        if QUOTE_INTRO.is_match(trimmed) {
            break;
        }
        if let Some(name) = sender_name {
            if !name.is_empty()
                && trimmed.to_lowercase().starts_with(&name.to_lowercase())
                && trimmed.to_lowercase().ends_with("wrote:")
            {
                break;
            }
        }
        // Quoted lines from the previous message.
        if trimmed.starts_with('>') || trimmed.starts_with("&gt;") {
            continue;
        }
        kept.push(line);
    }

    kept.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::common::Addr;

    fn email(plain: &str, html: Option<&str>) -> InboundEmail {
        InboundEmail {
            sender: Addr {
                name: Some("Jane Poster".into()),
                address: Some("jane@sender.example".into()),
            },
            plain_body: plain.into(),
            html_body: html.map(String::from),
            message_type: MessageType::TopicReply,
            ..Default::default()
        }
    }

    #[test]
    fn prefers_html_when_clean() {
        let rendered = render(
            &email("plain text", Some("<p>rich text</p>")),
            true,
        )
        .unwrap();
        assert!(rendered.used_html);
        assert_eq!(rendered.markup, "rich text");
    }

    #[test]
    fn two_tables_force_plain_fallback() {
        let html = "<table><tr><td><table><tr><td>wrapped</td></tr></table></td></tr></table>";
        let rendered = render(&email("plain text", Some(html)), true).unwrap();
        assert!(!rendered.used_html);
        assert_eq!(rendered.markup, "plain text");
    }

    #[test]
    fn quoted_reply_and_signature_are_stripped() {
        let plain = "Looks good to me.\n\
            \n\
            On Tue, 12 Aug 2025 at 09:12, Sam wrote:\n\
            > earlier message\n\
            > more quoting\n\
            --\n\
            Jane, from her phone";
        let rendered = render(&email(plain, None), false).unwrap();
        assert_eq!(rendered.markup, "Looks good to me.");
    }

    #[test]
    fn sender_name_intro_line_cuts_the_body() {
        let plain = "Agreed.\nJane Poster wrote:\nold text";
        let rendered = render(&email(plain, None), false).unwrap();
        assert_eq!(rendered.markup, "Agreed.");
    }

    #[test]
    fn empty_after_stripping_is_none() {
        let plain = "> quoted only\n> nothing else\n";
        assert!(render(&email(plain, None), false).is_none());
    }

    #[test]
    fn legacy_charset_drops_replacement_chars() {
        let mut lossy = email("caf\u{FFFD} plans", None);
        lossy.charset = Some("iso-8859-1".into());
        assert_eq!(render(&lossy, false).unwrap().markup, "caf plans");

        let mut clean = email("caf\u{FFFD} plans", None);
        clean.charset = Some("utf-8".into());
        assert_eq!(render(&clean, false).unwrap().markup, "caf\u{FFFD} plans");
    }

    #[test]
    fn pm_bodies_skip_normalization() {
        let mut pm = email("[quote]unbalanced", None);
        pm.message_type = MessageType::PmReply;
        let rendered = render(&pm, false).unwrap();
        // No closing tag appended for PM targets.
        assert_eq!(rendered.markup, "[quote]unbalanced");
    }
}
