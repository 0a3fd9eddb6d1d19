// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use tracing::info;

use crate::modules::content::{apply_attachment_plan, plan_attachments};
use crate::modules::email::InboundEmail;
use crate::modules::error::MailBoardResult;
use crate::modules::forum::pm::PmMessage;
use crate::modules::gateway::GatewayConfig;
use crate::modules::member::Member;
use crate::modules::notification::{self, NotificationKind};

pub struct PmRequest<'a> {
    /// The private message being replied to.
    pub original: &'a PmMessage,
    /// Subject with the localized reply prefix already applied.
    pub subject: String,
    /// Transformed body markup (PMs skip pre-save normalization).
    pub body: String,
    pub email: &'a InboundEmail,
    pub sender: &'a Member,
    pub config: &'a GatewayConfig,
}

/// Persists a PM reply into the originating thread, marks the original
/// message read and replied for the sender's mailbox, and queues a
/// notification for the recipient.
pub async fn create_private_message(request: PmRequest<'_>) -> MailBoardResult<u64> {
    let mut body = request.body;
    // Attachment rows are never written for private messages; only the
    // disabled-feature notice applies.
    let plan = plan_attachments(&request.email.attachments, request.sender, true, request.config);
    let _ = apply_attachment_plan(plan, &mut body);

    // Reply goes back to whoever sent the original message.
    let recipient_id = if request.original.sender_id == request.sender.id {
        request.original.recipient_id
    } else {
        request.original.sender_id
    };

    let message = PmMessage::new(
        Some(request.original.thread_head_id),
        request.sender.id,
        &request.sender.display_name,
        recipient_id,
        &request.subject,
        &body,
    );
    message.save().await?;

    PmMessage::mark_read_replied(request.original.id).await?;
    notification::queue_for_member(recipient_id, message.id, NotificationKind::PmReceived).await?;

    info!(
        pm_id = message.id,
        thread_head_id = request.original.thread_head_id,
        "private message created from email"
    );
    Ok(message.id)
}
