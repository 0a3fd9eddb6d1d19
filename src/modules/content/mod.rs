// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

//! Content creation orchestrations. Each operation persists the content row,
//! updates counters, sets up subscriptions, and queues notifications — the
//! gateway supplies an already-authorized request.

use crate::modules::email::EmailAttachment;
use crate::modules::forum::attachment::Attachment;
use crate::modules::gateway::GatewayConfig;
use crate::modules::member::Member;
use crate::modules::permission;

pub mod pm;
pub mod reply;
pub mod topic;

/// Line appended to the body when attachments arrived but could not be
/// imported. Attachments are never dropped without a visible trace.
pub(crate) const ATTACHMENT_NOTICE: &str =
    "\n\n[This email included attachments that could not be imported.]";

/// What to do with the attachments of an inbound email.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum AttachmentPlan {
    /// Nothing attached.
    None,
    /// Feature disabled: append the explanatory notice, persist nothing.
    Notice,
    /// Sender lacks the attach grant for this moderation state: drop quietly.
    Drop,
    /// Persist attachment rows.
    Store,
}

pub(crate) fn plan_attachments(
    attachments: &[EmailAttachment],
    member: &Member,
    content_approved: bool,
    config: &GatewayConfig,
) -> AttachmentPlan {
    if attachments.is_empty() {
        return AttachmentPlan::None;
    }
    if !config.attachments_enabled {
        return AttachmentPlan::Notice;
    }
    if permission::check_attach(member, content_approved) {
        AttachmentPlan::Store
    } else {
        AttachmentPlan::Drop
    }
}

/// Applies the plan to the body (notice appending) and returns whether
/// attachment rows should be written.
pub(crate) fn apply_attachment_plan(plan: AttachmentPlan, body: &mut String) -> bool {
    match plan {
        AttachmentPlan::None | AttachmentPlan::Drop => false,
        AttachmentPlan::Notice => {
            body.push_str(ATTACHMENT_NOTICE);
            false
        }
        AttachmentPlan::Store => true,
    }
}

pub(crate) async fn store_attachments(
    post_id: u64,
    attachments: &[EmailAttachment],
    approved: bool,
) -> crate::modules::error::MailBoardResult<Vec<u64>> {
    let mut ids = Vec::with_capacity(attachments.len());
    for source in attachments {
        let attachment = Attachment::from_email(post_id, source, approved);
        attachment.save().await?;
        ids.push(attachment.id);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::permission::Permission;

    fn attachment() -> EmailAttachment {
        EmailAttachment {
            filename: "notes.txt".into(),
            mime_type: "text/plain".into(),
            size: 5,
            data: b"notes".to_vec(),
        }
    }

    #[test]
    fn disabled_feature_appends_notice() {
        let member = Member::new("a@forum.example", "A");
        let config = GatewayConfig {
            attachments_enabled: false,
            ..GatewayConfig::default()
        };
        let plan = plan_attachments(&[attachment()], &member, true, &config);
        assert_eq!(plan, AttachmentPlan::Notice);

        let mut body = String::from("hello");
        assert!(!apply_attachment_plan(plan, &mut body));
        assert!(body.ends_with(ATTACHMENT_NOTICE));
    }

    #[test]
    fn grant_is_required_to_store() {
        let member = Member::new("b@forum.example", "B");
        let config = GatewayConfig {
            attachments_enabled: true,
            ..GatewayConfig::default()
        };
        assert_eq!(
            plan_attachments(&[attachment()], &member, true, &config),
            AttachmentPlan::Drop
        );

        let mut granted = member.clone();
        granted.permissions = vec![Permission::AttachFiles];
        assert_eq!(
            plan_attachments(&[attachment()], &granted, true, &config),
            AttachmentPlan::Store
        );
    }
}
