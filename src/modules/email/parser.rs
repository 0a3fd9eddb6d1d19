// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::LazyLock;

use mail_parser::{Message, MessageParser, MimeHeaders};
use regex::Regex;

use crate::modules::common::{Addr, AddrVec};
use crate::modules::email::bounce::is_bounce;
use crate::modules::email::{EmailAttachment, InboundEmail, MessageType};

/// Local part of a posting address: `<mailbox>+<key>-<t|m|p><id>`,
/// e.g. `post+VRsGhmLkq3aF-m451@forum.example`.
static POSTING_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<mailbox>[^+@]+)\+(?P<key>[A-Za-z0-9]+)-(?P<tag>[tmp])(?P<id>\d+)$").unwrap()
});

/// Parses a raw inbound payload. Never errors: unparseable input yields an
/// empty `InboundEmail` of type `Unknown`, which every downstream check
/// treats as "fail closed".
pub fn parse(raw: &[u8]) -> InboundEmail {
    let Some(message) = MessageParser::new().parse(raw) else {
        return InboundEmail::default();
    };
    if message.is_empty() {
        return InboundEmail::default();
    }

    let sender = message
        .from()
        .map(Into::<AddrVec>::into)
        .and_then(|addr_vec| addr_vec.0.into_iter().next())
        .unwrap_or_default();

    let mut recipients: Vec<Addr> = Vec::new();
    for address in [message.to(), message.cc()].into_iter().flatten() {
        let addr_vec: AddrVec = address.into();
        recipients.extend(addr_vec.0);
    }

    let html_body = if message.html_body.is_empty() {
        None
    } else {
        message.body_html(0).map(|body| body.into_owned())
    };

    let plain_body = message
        .body_text(0)
        .map(|body| body.into_owned())
        .unwrap_or_default();

    let attachments = message
        .attachments()
        .filter(|part| part.is_text() || part.is_binary())
        .map(|part| {
            let data = part.contents().to_vec();
            let filename = part
                .attachment_name()
                .unwrap_or("unnamed")
                .replace(['/', '\\'], "_");
            let mime_type = part
                .content_type()
                .map(|ct| match ct.subtype() {
                    Some(subtype) => format!("{}/{}", ct.ctype(), subtype),
                    None => ct.ctype().to_string(),
                })
                .unwrap_or_else(|| {
                    mime_guess::from_path(&filename)
                        .first_or_octet_stream()
                        .to_string()
                });
            EmailAttachment {
                filename,
                mime_type,
                size: data.len() as u64,
                data,
            }
        })
        .collect();

    let (message_type, key, target_id) = classify(&recipients);

    InboundEmail {
        spam: spam_flagged(&message),
        bounce: is_bounce(&message),
        charset: message
            .content_type()
            .and_then(|ct| ct.attribute("charset"))
            .map(String::from),
        date: message.date().map(|date| date.to_timestamp() * 1000),
        sender,
        recipients,
        subject: message.subject().unwrap_or_default().to_string(),
        plain_body,
        html_body,
        attachments,
        message_type,
        target_id,
        key,
    }
}

/// Picks the first recipient that looks like a posting address. Emails sent
/// to a board's plain inbound address carry no plus part and stay `Unknown`
/// here; the address flow resolves them against the board table instead.
fn classify(recipients: &[Addr]) -> (MessageType, String, u64) {
    for recipient in recipients {
        let Some(address) = recipient.address.as_deref() else {
            continue;
        };
        let Some((local, _host)) = address.split_once('@') else {
            continue;
        };
        if let Some(caps) = POSTING_ADDRESS.captures(local) {
            let tag = caps["tag"].chars().next().unwrap_or_default();
            let target_id: u64 = caps["id"].parse().unwrap_or(0);
            return (
                MessageType::from_tag(tag),
                caps["key"].to_string(),
                target_id,
            );
        }
    }
    (MessageType::Unknown, String::new(), 0)
}

fn spam_flagged(message: &Message<'_>) -> bool {
    let header = |key: &str| -> Option<String> {
        message
            .headers()
            .iter()
            .find(|header| header.name().eq_ignore_ascii_case(key))
            .and_then(|header| header.value().as_text())
            .map(|value| value.to_string())
    };

    if let Some(flag) = header("X-Spam-Flag") {
        if flag.trim().eq_ignore_ascii_case("yes") {
            return true;
        }
    }
    if let Some(status) = header("X-Spam-Status") {
        if status.trim_start().to_ascii_lowercase().starts_with("yes") {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_email(to: &str, extra_headers: &str) -> Vec<u8> {
        format!(
            "From: Jane Poster <jane@sender.example>\r\n\
             To: {to}\r\n\
             Subject: Re: Weekly sync\r\n\
             {extra_headers}Content-Type: text/plain; charset=utf-8\r\n\
             \r\n\
             See you there.\r\n"
        )
        .into_bytes()
    }

    #[test]
    fn classifies_posting_address() {
        let email = parse(&raw_email("post+VRsGhmLkq3aF-m451@forum.example", ""));
        assert_eq!(email.message_type, MessageType::MessageReply);
        assert_eq!(email.key, "VRsGhmLkq3aF");
        assert_eq!(email.target_id, 451);
        assert_eq!(email.sender_address(), Some("jane@sender.example"));
        assert_eq!(email.plain_body.trim(), "See you there.");
    }

    #[test]
    fn pm_tag_maps_to_pm_reply() {
        let email = parse(&raw_email("post+abc123-p9@forum.example", ""));
        assert_eq!(email.message_type, MessageType::PmReply);
        assert_eq!(email.target_id, 9);
    }

    #[test]
    fn plain_address_stays_unknown() {
        let email = parse(&raw_email("announcements@forum.example", ""));
        assert_eq!(email.message_type, MessageType::Unknown);
        assert!(email.key.is_empty());
        assert_eq!(email.target_id, 0);
    }

    #[test]
    fn date_header_becomes_millis() {
        let email = parse(&raw_email(
            "post+abc123-t7@forum.example",
            "Date: Tue, 12 Aug 2025 09:12:00 +0000\r\n",
        ));
        assert_eq!(email.date, Some(1_754_989_920_000));
    }

    #[test]
    fn spam_header_sets_flag() {
        let email = parse(&raw_email(
            "post+abc123-t7@forum.example",
            "X-Spam-Flag: YES\r\n",
        ));
        assert!(email.spam);
    }

    #[test]
    fn garbage_input_yields_empty_unknown() {
        let email = parse(b"");
        assert!(email.is_empty());
        assert_eq!(email.message_type, MessageType::Unknown);
    }
}
