// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use poem_openapi::Enum;
use serde::{Deserialize, Serialize};

use crate::modules::forum::topic::Topic;
use crate::modules::gateway::GatewayConfig;
use crate::modules::member::Member;
use crate::utc_now;

/// Capability grants a member may hold. The unapproved variants only matter
/// while post-moderation is active: they allow the action but hold the result
/// for moderator approval.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, Enum)]
pub enum Permission {
    /// Reply to topics the member started.
    ReplyToOwn,
    /// Reply to topics the member started, held for approval.
    ReplyToOwnUnapproved,
    /// Reply to any topic.
    ReplyToAny,
    /// Reply to any topic, held for approval.
    ReplyToAnyUnapproved,
    /// Start new topics.
    PostNew,
    /// Start new topics, held for approval.
    PostNewUnapproved,
    /// Blanket prerequisite for submitting new topics by email.
    PostByEmail,
    /// Send private messages.
    SendPm,
    /// Board moderation: bypasses topic locks.
    ModerateBoard,
    /// Attach files to posts.
    AttachFiles,
    /// Attach files to posts, held for approval.
    AttachFilesUnapproved,
}

/// Outcome of a permission matrix.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, Enum)]
pub enum AccessDecision {
    /// Allowed, content is immediately visible.
    Approved,
    /// Allowed, content is held for moderator approval.
    Pending,
    Denied,
}

/// Reply matrix. Administrators are always approved; locked topics require
/// board moderation; starters and non-starters use their own grant pairs.
pub fn check_reply(member: &Member, topic: &Topic, config: &GatewayConfig) -> AccessDecision {
    if member.is_admin {
        return AccessDecision::Approved;
    }
    if topic.locked && !member.has(Permission::ModerateBoard) {
        return AccessDecision::Denied;
    }

    let (direct, unapproved) = if topic.starter_id == member.id {
        (Permission::ReplyToOwn, Permission::ReplyToOwnUnapproved)
    } else {
        (Permission::ReplyToAny, Permission::ReplyToAnyUnapproved)
    };

    let decision = if member.has(direct) {
        AccessDecision::Approved
    } else if config.post_moderation_active && member.has(unapproved) {
        AccessDecision::Pending
    } else {
        AccessDecision::Denied
    };

    apply_member_restriction(member, decision, unapproved)
}

/// New-topic matrix. `PostByEmail` is a blanket prerequisite for every
/// non-admin sender; the forced-approval override downgrades approved
/// outcomes to pending.
pub fn check_new_topic(member: &Member, config: &GatewayConfig) -> AccessDecision {
    if member.is_admin {
        return AccessDecision::Approved;
    }
    if !member.has(Permission::PostByEmail) {
        return AccessDecision::Denied;
    }

    let mut decision = if member.has(Permission::PostNew) {
        AccessDecision::Approved
    } else if config.post_moderation_active && member.has(Permission::PostNewUnapproved) {
        AccessDecision::Pending
    } else {
        AccessDecision::Denied
    };

    if config.force_approval_for_new_topics && decision == AccessDecision::Approved {
        decision = AccessDecision::Pending;
    }

    apply_member_restriction(member, decision, Permission::PostNewUnapproved)
}

/// PM matrix. No pending state exists for private messages.
pub fn check_send_pm(member: &Member) -> AccessDecision {
    if member.is_admin || member.has(Permission::SendPm) {
        AccessDecision::Approved
    } else {
        AccessDecision::Denied
    }
}

/// Attachment matrix for an already-decided moderation state: approved
/// content needs the direct grant, pending content accepts either grant.
pub fn check_attach(member: &Member, content_approved: bool) -> bool {
    if member.is_admin {
        return true;
    }
    if content_approved {
        member.has(Permission::AttachFiles)
    } else {
        member.has(Permission::AttachFiles) || member.has(Permission::AttachFilesUnapproved)
    }
}

/// A temporary member restriction downgrades an approved outcome to pending
/// where the matching unapproved grant exists.
fn apply_member_restriction(
    member: &Member,
    decision: AccessDecision,
    unapproved: Permission,
) -> AccessDecision {
    if decision == AccessDecision::Approved
        && member.is_moderated(utc_now!())
        && member.has(unapproved)
    {
        AccessDecision::Pending
    } else {
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member_with(permissions: &[Permission]) -> Member {
        let mut member = Member::new("perm@forum.example", "Perm");
        member.permissions = permissions.to_vec();
        member
    }

    fn open_topic(starter_id: u64) -> Topic {
        Topic::new(1, "Subject", starter_id, "Starter")
    }

    fn config(post_moderation_active: bool) -> GatewayConfig {
        GatewayConfig {
            post_moderation_active,
            ..GatewayConfig::default()
        }
    }

    #[test]
    fn admin_is_always_approved() {
        let mut member = member_with(&[]);
        member.is_admin = true;
        let mut topic = open_topic(0);
        topic.locked = true;
        assert_eq!(
            check_reply(&member, &topic, &config(false)),
            AccessDecision::Approved
        );
        assert_eq!(check_new_topic(&member, &config(false)), AccessDecision::Approved);
        assert_eq!(check_send_pm(&member), AccessDecision::Approved);
    }

    #[test]
    fn locked_topic_denies_without_moderation() {
        let member = member_with(&[Permission::ReplyToAny]);
        let mut topic = open_topic(0);
        topic.locked = true;
        assert_eq!(
            check_reply(&member, &topic, &config(false)),
            AccessDecision::Denied
        );

        let moderator = member_with(&[Permission::ReplyToAny, Permission::ModerateBoard]);
        assert_eq!(
            check_reply(&moderator, &topic, &config(false)),
            AccessDecision::Approved
        );
    }

    #[test]
    fn starter_with_unapproved_grant_gets_pending_under_moderation() {
        let member = member_with(&[Permission::ReplyToOwnUnapproved]);
        let topic = open_topic(member.id);
        assert_eq!(
            check_reply(&member, &topic, &config(true)),
            AccessDecision::Pending
        );
        // Without post-moderation the unapproved grant alone is not enough.
        assert_eq!(
            check_reply(&member, &topic, &config(false)),
            AccessDecision::Denied
        );
    }

    #[test]
    fn non_starter_without_grants_is_denied() {
        let member = member_with(&[Permission::ReplyToOwn]);
        let topic = open_topic(member.id + 1);
        assert_eq!(
            check_reply(&member, &topic, &config(true)),
            AccessDecision::Denied
        );
    }

    #[test]
    fn post_by_email_is_a_blanket_prerequisite() {
        let member = member_with(&[Permission::PostNew]);
        assert_eq!(check_new_topic(&member, &config(false)), AccessDecision::Denied);

        let allowed = member_with(&[Permission::PostNew, Permission::PostByEmail]);
        assert_eq!(
            check_new_topic(&allowed, &config(false)),
            AccessDecision::Approved
        );
    }

    #[test]
    fn forced_approval_downgrades_new_topics() {
        let member = member_with(&[Permission::PostNew, Permission::PostByEmail]);
        let mut cfg = config(false);
        cfg.force_approval_for_new_topics = true;
        assert_eq!(check_new_topic(&member, &cfg), AccessDecision::Pending);
    }

    #[test]
    fn restricted_member_is_downgraded_to_pending() {
        let mut member = member_with(&[Permission::ReplyToAny, Permission::ReplyToAnyUnapproved]);
        member.moderated_until = Some(utc_now!() + 60_000);
        let topic = open_topic(0);
        assert_eq!(
            check_reply(&member, &topic, &config(true)),
            AccessDecision::Pending
        );
    }

    #[test]
    fn pm_requires_the_send_pm_grant() {
        assert_eq!(check_send_pm(&member_with(&[])), AccessDecision::Denied);
        assert_eq!(
            check_send_pm(&member_with(&[Permission::SendPm])),
            AccessDecision::Approved
        );
    }
}
