// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use poem_openapi::{Enum, Object};
use serde::{Deserialize, Serialize};

use crate::modules::common::Addr;

pub mod bounce;
pub mod parser;

/// Classification of an inbound email, derived from the plus-address tag of
/// the recipient. Exhaustive matches everywhere — adding a variant must fail
/// compilation at every dispatch site.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize, Enum)]
pub enum MessageType {
    /// Reply to a topic (`t` tag).
    TopicReply,
    /// Reply to a specific message within a topic (`m` tag).
    MessageReply,
    /// Reply to a private-message thread (`p` tag).
    PmReply,
    /// New topic submitted to a board's dedicated inbound address (no key).
    NewTopicByAddress,
    /// Anything the parser could not classify. The gateway fails closed.
    #[default]
    Unknown,
}

impl MessageType {
    pub fn from_tag(tag: char) -> Self {
        match tag {
            't' => MessageType::TopicReply,
            'm' => MessageType::MessageReply,
            'p' => MessageType::PmReply,
            'x' => MessageType::NewTopicByAddress,
            _ => MessageType::Unknown,
        }
    }

    pub fn tag(&self) -> Option<char> {
        match self {
            MessageType::TopicReply => Some('t'),
            MessageType::MessageReply => Some('m'),
            MessageType::PmReply => Some('p'),
            MessageType::NewTopicByAddress => Some('x'),
            MessageType::Unknown => None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Object)]
pub struct EmailAttachment {
    /// File name as declared by the sender, sanitized by the parser.
    pub filename: String,
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
    /// Decoded size in bytes.
    pub size: u64,
    /// Decoded content.
    pub data: Vec<u8>,
}

/// One parsed inbound email. Ephemeral — lives for a single unit of work and
/// is never persisted (the raw payload is what FailureRecord keeps).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InboundEmail {
    pub sender: Addr,
    pub recipients: Vec<Addr>,
    pub subject: String,
    pub plain_body: String,
    pub html_body: Option<String>,
    pub attachments: Vec<EmailAttachment>,
    pub message_type: MessageType,
    /// Target content id extracted from the posting address; 0 when absent.
    pub target_id: u64,
    /// One-time posting key extracted from the posting address; empty when absent.
    pub key: String,
    pub bounce: bool,
    pub spam: bool,
    /// Charset label of the source body, used as a reformat hint.
    pub charset: Option<String>,
    /// Sent timestamp from the `Date` header, milliseconds since the Unix
    /// epoch.
    pub date: Option<i64>,
}

impl InboundEmail {
    pub fn sender_address(&self) -> Option<&str> {
        self.sender.address.as_deref()
    }

    /// True when parsing produced literally nothing to work with.
    pub fn is_empty(&self) -> bool {
        self.subject.is_empty()
            && self.plain_body.is_empty()
            && self.html_body.is_none()
            && self.attachments.is_empty()
            && self.sender.address.is_none()
    }
}
