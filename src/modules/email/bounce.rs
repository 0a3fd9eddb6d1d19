// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use mail_parser::{Message, MimeHeaders};

/// Detects delivery-status notifications. A DSN either arrives as
/// `multipart/report; report-type=delivery-status`, carries a
/// `message/delivery-status` part, or comes from the local mailer daemon.
pub fn is_bounce(message: &Message<'_>) -> bool {
    if let Some(content_type) = message.content_type() {
        let is_report = content_type.ctype().eq_ignore_ascii_case("multipart")
            && content_type
                .subtype()
                .is_some_and(|st| st.eq_ignore_ascii_case("report"));
        if is_report
            && content_type
                .attribute("report-type")
                .is_some_and(|rt| rt.eq_ignore_ascii_case("delivery-status"))
        {
            return true;
        }
    }

    let has_status_part = message.parts.iter().any(|part| {
        part.content_type()
            .and_then(|ct| ct.subtype())
            .is_some_and(|st| st.to_lowercase().contains("delivery-status"))
    });
    if has_status_part {
        return true;
    }

    message
        .from()
        .and_then(|address| address.first())
        .and_then(|addr| addr.address.as_deref())
        .map(|address| {
            let local = address.split('@').next().unwrap_or_default().to_lowercase();
            local == "mailer-daemon" || local == "postmaster"
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mail_parser::MessageParser;

    #[test]
    fn mailer_daemon_sender_is_a_bounce() {
        let raw = b"From: MAILER-DAEMON@mx.example\r\n\
            To: post+abc-t1@forum.example\r\n\
            Subject: Undelivered Mail Returned to Sender\r\n\
            \r\n\
            The following message could not be delivered.\r\n";
        let message = MessageParser::new().parse(&raw[..]).unwrap();
        assert!(is_bounce(&message));
    }

    #[test]
    fn ordinary_reply_is_not_a_bounce() {
        let raw = b"From: jane@sender.example\r\n\
            To: post+abc-t1@forum.example\r\n\
            Subject: Re: hello\r\n\
            \r\n\
            A normal reply.\r\n";
        let message = MessageParser::new().parse(&raw[..]).unwrap();
        assert!(!is_bounce(&message));
    }
}
