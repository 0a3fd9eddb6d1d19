// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::email::MessageType;
use crate::modules::forum::attachment::Attachment;
use crate::modules::forum::board::Board;
use crate::modules::forum::post::Post;
use crate::modules::forum::topic::Topic;
use crate::modules::gateway::failure::{FailureKind, FailureRecord};
use crate::modules::gateway::{CreatedKind, EmailGateway, GatewayConfig, IngestOutcome, MaintenanceMode};
use crate::modules::key::PostingKey;
use crate::modules::member::Member;
use crate::modules::permission::Permission;

const HOST: &str = "forum.example";

fn raw_email(from: &str, to: &str, subject: &str, body: &str) -> Vec<u8> {
    format!(
        "From: {from}\r\nTo: {to}\r\nSubject: {subject}\r\n\r\n{body}\r\n"
    )
    .into_bytes()
}

async fn seed_member(email: &str, permissions: &[Permission]) -> Member {
    let mut member = Member::new(email, "Test Member");
    member.permissions = permissions.to_vec();
    member.save().await.unwrap();
    member
}

async fn seed_topic(starter: &Member) -> (Board, Topic) {
    let board = Board::new("General", None);
    board.save().await.unwrap();
    let topic = Topic::new(board.id, "Weekly sync", starter.id, &starter.display_name);
    topic.save().await.unwrap();
    (board, topic)
}

async fn issue_address(member: &Member, message_type: MessageType, target_id: u64) -> String {
    let key = PostingKey::issue(member, message_type, target_id)
        .await
        .unwrap();
    key.posting_address("post", HOST).unwrap()
}

async fn failure_count() -> u64 {
    FailureRecord::paginate_list(None, None, None)
        .await
        .unwrap()
        .total_items
}

#[tokio::test]
async fn silent_bounce_disables_notifications_without_a_record() {
    let member = seed_member("bouncer@sender.example", &[]).await;
    let config = GatewayConfig {
        bounce_auto_disable: true,
        bounce_record_anyway: false,
        ..GatewayConfig::default()
    };

    let raw = format!(
        "From: bouncer@sender.example\r\n\
         To: post+abc123-t1@{HOST}\r\n\
         Subject: Undelivered Mail\r\n\
         Content-Type: multipart/report; report-type=delivery-status; boundary=\"b\"\r\n\
         \r\n\
         --b\r\n\
         Content-Type: text/plain\r\n\
         \r\n\
         delivery failed\r\n\
         --b--\r\n"
    );

    let before = failure_count().await;
    let outcome = EmailGateway::new(config, false)
        .reply_or_new_topic_by_key(raw.as_bytes(), false)
        .await
        .unwrap();

    assert_eq!(outcome, IngestOutcome::Rejected(FailureKind::Bounced));
    assert_eq!(failure_count().await, before);
    let reloaded = Member::get(member.id).await.unwrap().unwrap();
    assert!(!reloaded.notifications_enabled);
}

#[tokio::test]
async fn bounce_without_auto_disable_is_always_recorded() {
    seed_member("recorded-bounce@sender.example", &[]).await;
    let config = GatewayConfig {
        bounce_auto_disable: false,
        ..GatewayConfig::default()
    };

    let raw = format!(
        "From: MAILER-DAEMON@mx.example\r\n\
         To: post+abc123-t1@{HOST}\r\n\
         Subject: Undelivered Mail Returned to Sender\r\n\
         \r\n\
         delivery failed\r\n"
    );

    let before = failure_count().await;
    let outcome = EmailGateway::new(config, false)
        .reply_or_new_topic_by_key(raw.as_bytes(), false)
        .await
        .unwrap();
    assert_eq!(outcome, IngestOutcome::Rejected(FailureKind::Bounced));
    assert_eq!(failure_count().await, before + 1);
}

#[tokio::test]
async fn key_authorizes_exactly_one_creation() {
    let member = seed_member("single-use@sender.example", &[Permission::ReplyToAny]).await;
    let (_, topic) = seed_topic(&seed_member("starter1@sender.example", &[]).await).await;
    let address = issue_address(&member, MessageType::TopicReply, topic.id).await;

    let raw = raw_email(
        "single-use@sender.example",
        &address,
        "Re: Weekly sync",
        "Count me in.",
    );
    let gateway = EmailGateway::new(GatewayConfig::default(), false);

    let first = gateway.reply_or_new_topic_by_key(&raw, false).await.unwrap();
    assert!(matches!(
        first,
        IngestOutcome::Created {
            kind: CreatedKind::Reply,
            ..
        }
    ));

    // Duplicate delivery: the key is gone, no second reply appears.
    let second = gateway.reply_or_new_topic_by_key(&raw, false).await.unwrap();
    assert_eq!(second, IngestOutcome::Rejected(FailureKind::KeyNotFound));

    let posts = Post::list_by_topic(topic.id).await.unwrap();
    assert_eq!(posts.len(), 1);
}

// A key authorizes exactly the target it was issued for; rewriting the
// address tag or target id is treated as an unknown key and consumes
// nothing.
#[tokio::test]
async fn key_issued_for_one_target_rejects_another() {
    let member = seed_member("redirector@sender.example", &[Permission::ReplyToAny]).await;
    let starter = seed_member("starter10@sender.example", &[]).await;
    let (_, topic_a) = seed_topic(&starter).await;
    let (_, topic_b) = seed_topic(&starter).await;
    let key = PostingKey::issue(&member, MessageType::TopicReply, topic_a.id)
        .await
        .unwrap();
    let gateway = EmailGateway::new(GatewayConfig::default(), false);

    let forged_target = format!("post+{}-t{}@{HOST}", key.key, topic_b.id);
    let raw = raw_email(
        "redirector@sender.example",
        &forged_target,
        "Re: Weekly sync",
        "redirected",
    );
    let outcome = gateway.reply_or_new_topic_by_key(&raw, false).await.unwrap();
    assert_eq!(outcome, IngestOutcome::Rejected(FailureKind::KeyNotFound));
    assert!(Post::list_by_topic(topic_b.id).await.unwrap().is_empty());

    let forged_tag = format!("post+{}-p{}@{HOST}", key.key, topic_a.id);
    let raw = raw_email(
        "redirector@sender.example",
        &forged_tag,
        "Re: Weekly sync",
        "redirected",
    );
    let outcome = gateway.reply_or_new_topic_by_key(&raw, false).await.unwrap();
    assert_eq!(outcome, IngestOutcome::Rejected(FailureKind::KeyNotFound));

    // The key survives for its real target.
    assert!(PostingKey::resolve(&key.key).await.unwrap().is_some());
}

#[tokio::test]
async fn denied_member_records_failure_and_creates_nothing() {
    let member = seed_member("no-grants@sender.example", &[]).await;
    let (_, topic) = seed_topic(&seed_member("starter2@sender.example", &[]).await).await;
    let address = issue_address(&member, MessageType::TopicReply, topic.id).await;

    let raw = raw_email("no-grants@sender.example", &address, "Re: Weekly sync", "hi");
    let outcome = EmailGateway::new(GatewayConfig::default(), false)
        .reply_or_new_topic_by_key(&raw, false)
        .await
        .unwrap();

    assert_eq!(outcome, IngestOutcome::Rejected(FailureKind::PermissionDenied));
    assert!(Post::list_by_topic(topic.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_body_after_transformation_is_rejected() {
    let member = seed_member("quoter@sender.example", &[Permission::ReplyToAny]).await;
    let (_, topic) = seed_topic(&seed_member("starter3@sender.example", &[]).await).await;
    let address = issue_address(&member, MessageType::TopicReply, topic.id).await;

    let raw = raw_email(
        "quoter@sender.example",
        &address,
        "Re: Weekly sync",
        "> nothing but quotes\r\n> of the old message",
    );
    let outcome = EmailGateway::new(GatewayConfig::default(), false)
        .reply_or_new_topic_by_key(&raw, false)
        .await
        .unwrap();

    assert_eq!(outcome, IngestOutcome::Rejected(FailureKind::NoMessageBody));
    assert!(Post::list_by_topic(topic.id).await.unwrap().is_empty());
}

// Scenario: topic starter holds only the unapproved reply grant under
// post-moderation — the reply is created held for approval.
#[tokio::test]
async fn starter_with_unapproved_grant_creates_pending_reply() {
    let member = seed_member(
        "starter-pending@sender.example",
        &[Permission::ReplyToOwnUnapproved],
    )
    .await;
    let (_, topic) = seed_topic(&member).await;
    let address = issue_address(&member, MessageType::TopicReply, topic.id).await;

    let config = GatewayConfig {
        post_moderation_active: true,
        ..GatewayConfig::default()
    };
    let raw = raw_email(
        "starter-pending@sender.example",
        &address,
        "Re: Weekly sync",
        "More thoughts.",
    );
    let outcome = EmailGateway::new(config, false)
        .reply_or_new_topic_by_key(&raw, false)
        .await
        .unwrap();

    assert!(matches!(outcome, IngestOutcome::Created { .. }));
    let posts = Post::list_by_topic(topic.id).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert!(!posts[0].approved);
}

// Scenario: full maintenance mode rejects non-admins regardless of key
// validity, and leaves the key unconsumed.
#[tokio::test]
async fn maintenance_mode_blocks_non_admins() {
    let member = seed_member("maint@sender.example", &[Permission::ReplyToAny]).await;
    let (_, topic) = seed_topic(&seed_member("starter4@sender.example", &[]).await).await;
    let key = PostingKey::issue(&member, MessageType::TopicReply, topic.id)
        .await
        .unwrap();
    let address = key.posting_address("post", HOST).unwrap();

    let config = GatewayConfig {
        maintenance: MaintenanceMode::Full,
        ..GatewayConfig::default()
    };
    let raw = raw_email("maint@sender.example", &address, "Re: Weekly sync", "hello");
    let outcome = EmailGateway::new(config, false)
        .reply_or_new_topic_by_key(&raw, false)
        .await
        .unwrap();

    assert_eq!(outcome, IngestOutcome::Rejected(FailureKind::MaintenanceMode));
    assert!(PostingKey::resolve(&key.key).await.unwrap().is_some());
}

#[tokio::test]
async fn admin_session_bypasses_maintenance_mode() {
    let member = seed_member("maint-admin@sender.example", &[Permission::ReplyToAny]).await;
    let (_, topic) = seed_topic(&seed_member("starter5@sender.example", &[]).await).await;
    let address = issue_address(&member, MessageType::TopicReply, topic.id).await;

    let config = GatewayConfig {
        maintenance: MaintenanceMode::Full,
        ..GatewayConfig::default()
    };
    let raw = raw_email("maint-admin@sender.example", &address, "Re: Weekly sync", "ok");
    let outcome = EmailGateway::new(config, true)
        .reply_or_new_topic_by_key(&raw, false)
        .await
        .unwrap();
    assert!(matches!(outcome, IngestOutcome::Created { .. }));
}

// Scenario: a message reply whose subject no longer matches the topic is
// re-routed to topic creation on the same board.
#[tokio::test]
async fn changed_subject_reroutes_to_topic_creation() {
    let member = seed_member(
        "rerouter@sender.example",
        &[
            Permission::ReplyToAny,
            Permission::PostNew,
            Permission::PostByEmail,
        ],
    )
    .await;
    let (board, topic) = seed_topic(&seed_member("starter6@sender.example", &[]).await).await;
    let post = Post::new(
        topic.id,
        board.id,
        "Weekly sync",
        "opening",
        topic.starter_id,
        "Starter",
        "starter6@sender.example",
        true,
        None,
    );
    post.save().await.unwrap();
    let address = issue_address(&member, MessageType::MessageReply, post.id).await;

    let raw = raw_email(
        "rerouter@sender.example",
        &address,
        "Completely different plan",
        "Let us talk about something else.",
    );
    let outcome = EmailGateway::new(GatewayConfig::default(), false)
        .reply_or_new_topic_by_key(&raw, false)
        .await
        .unwrap();

    let IngestOutcome::Created { kind, id } = outcome else {
        panic!("expected a created outcome, got {:?}", outcome);
    };
    assert_eq!(kind, CreatedKind::Topic);

    let new_topic = Topic::get(id).await.unwrap().unwrap();
    assert_eq!(new_topic.subject, "Completely different plan");
    assert_eq!(new_topic.board_id, board.id);
    // The original topic gained no reply.
    assert_eq!(Post::list_by_topic(topic.id).await.unwrap().len(), 1);
}

// Scenario: attachments arrive while the attachment feature is off — the
// body carries the explanatory notice and no attachment rows exist.
#[tokio::test]
async fn disabled_attachments_leave_a_notice() {
    let member = seed_member(
        "attacher@sender.example",
        &[Permission::ReplyToAny, Permission::AttachFiles],
    )
    .await;
    let (_, topic) = seed_topic(&seed_member("starter7@sender.example", &[]).await).await;
    let address = issue_address(&member, MessageType::TopicReply, topic.id).await;

    let raw = format!(
        "From: attacher@sender.example\r\n\
         To: {address}\r\n\
         Subject: Re: Weekly sync\r\n\
         Content-Type: multipart/mixed; boundary=\"m\"\r\n\
         \r\n\
         --m\r\n\
         Content-Type: text/plain\r\n\
         \r\n\
         Here is the file.\r\n\
         --m\r\n\
         Content-Type: application/pdf; name=\"plan.pdf\"\r\n\
         Content-Disposition: attachment; filename=\"plan.pdf\"\r\n\
         Content-Transfer-Encoding: base64\r\n\
         \r\n\
         JVBERi0xLjQ=\r\n\
         --m--\r\n"
    );

    let config = GatewayConfig {
        attachments_enabled: false,
        ..GatewayConfig::default()
    };
    let outcome = EmailGateway::new(config, false)
        .reply_or_new_topic_by_key(raw.as_bytes(), false)
        .await
        .unwrap();
    assert!(matches!(outcome, IngestOutcome::Created { .. }));

    let posts = Post::list_by_topic(topic.id).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert!(posts[0].body.contains("could not be imported"));
    assert!(Attachment::list_by_post(posts[0].id).await.unwrap().is_empty());
}

#[tokio::test]
async fn disabled_gateway_ignores_silently() {
    let config = GatewayConfig {
        email_posting_enabled: false,
        ..GatewayConfig::default()
    };
    let before = failure_count().await;
    let raw = raw_email("anyone@sender.example", "post+k-t1@forum.example", "x", "y");
    let outcome = EmailGateway::new(config, false)
        .reply_or_new_topic_by_key(&raw, false)
        .await
        .unwrap();
    assert_eq!(outcome, IngestOutcome::Ignored);
    assert_eq!(failure_count().await, before);
}

#[tokio::test]
async fn unknown_sender_is_rejected() {
    let (_, topic) = seed_topic(&seed_member("starter8@sender.example", &[]).await).await;
    let helper = seed_member("key-holder@sender.example", &[]).await;
    let address = issue_address(&helper, MessageType::TopicReply, topic.id).await;

    let raw = raw_email("stranger@sender.example", &address, "Re: x", "hello");
    let outcome = EmailGateway::new(GatewayConfig::default(), false)
        .reply_or_new_topic_by_key(&raw, false)
        .await
        .unwrap();
    assert_eq!(outcome, IngestOutcome::Rejected(FailureKind::MemberNotFound));
}

#[tokio::test]
async fn sender_key_mismatch_is_rejected() {
    let owner = seed_member("owner@sender.example", &[Permission::ReplyToAny]).await;
    let intruder = seed_member("intruder@sender.example", &[Permission::ReplyToAny]).await;
    let (_, topic) = seed_topic(&owner).await;
    let address = issue_address(&owner, MessageType::TopicReply, topic.id).await;
    let _ = intruder;

    let raw = raw_email("intruder@sender.example", &address, "Re: x", "hello");
    let outcome = EmailGateway::new(GatewayConfig::default(), false)
        .reply_or_new_topic_by_key(&raw, false)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        IngestOutcome::Rejected(FailureKind::SenderKeyMismatch)
    );
}

#[tokio::test]
async fn external_veto_blocks_creation() {
    let member = seed_member("vetoed@sender.example", &[Permission::ReplyToAny]).await;
    let (_, topic) = seed_topic(&seed_member("starter9@sender.example", &[]).await).await;
    let address = issue_address(&member, MessageType::TopicReply, topic.id).await;

    let gateway = EmailGateway::new(GatewayConfig::default(), false)
        .with_veto(|email, _member| {
            (!email.attachments.is_empty()).then_some(FailureKind::AttachmentRejected)
        })
        .with_veto(|email, _member| {
            email
                .subject
                .contains("viagra")
                .then_some(FailureKind::SpamDetected)
        });

    let raw = raw_email("vetoed@sender.example", &address, "cheap viagra", "hi");
    let outcome = gateway.reply_or_new_topic_by_key(&raw, false).await.unwrap();
    assert_eq!(outcome, IngestOutcome::Rejected(FailureKind::SpamDetected));
    assert!(Post::list_by_topic(topic.id).await.unwrap().is_empty());
}

// Step order: the target is resolved before external vetoes run, so a dead
// target is what gets recorded even when a veto would also fire.
#[tokio::test]
async fn missing_target_is_reported_before_external_vetoes() {
    let member = seed_member("veto-order@sender.example", &[Permission::ReplyToAny]).await;
    let key = PostingKey::issue(&member, MessageType::TopicReply, 424_242)
        .await
        .unwrap();
    let address = key.posting_address("post", HOST).unwrap();

    let gateway = EmailGateway::new(GatewayConfig::default(), false)
        .with_veto(|_email, _member| Some(FailureKind::SpamDetected));

    let raw = raw_email("veto-order@sender.example", &address, "Re: gone", "text");
    let outcome = gateway.reply_or_new_topic_by_key(&raw, false).await.unwrap();
    assert_eq!(outcome, IngestOutcome::Rejected(FailureKind::TargetGone));
}

// The retry path routes on the recipient shape, so a board-address email
// that failed once can succeed after the board exists.
#[tokio::test]
async fn ingest_routes_board_addresses_to_the_address_flow() {
    seed_member(
        "router@sender.example",
        &[Permission::PostNew, Permission::PostByEmail],
    )
    .await;
    let raw = raw_email(
        "router@sender.example",
        &format!("inbox@{HOST}"),
        "Routed",
        "body",
    );

    let gateway = EmailGateway::new(GatewayConfig::default(), true);
    let first = gateway.ingest(&raw, true).await.unwrap();
    assert_eq!(first, IngestOutcome::Rejected(FailureKind::TargetGone));

    let board = Board::new("Routed", Some(format!("inbox@{HOST}")));
    board.save().await.unwrap();

    let retried = gateway.ingest(&raw, true).await.unwrap();
    assert!(matches!(
        retried,
        IngestOutcome::Created {
            kind: CreatedKind::Topic,
            ..
        }
    ));
}

#[tokio::test]
async fn new_topic_by_address_resolves_the_board() {
    let member = seed_member(
        "board-poster@sender.example",
        &[Permission::PostNew, Permission::PostByEmail],
    )
    .await;
    let board = Board::new("Ideas", Some(format!("ideas@{HOST}")));
    board.save().await.unwrap();
    let _ = &member;

    let raw = raw_email(
        "board-poster@sender.example",
        &format!("ideas@{HOST}"),
        "A fresh idea",
        "We should try this.",
    );
    let outcome = EmailGateway::new(GatewayConfig::default(), false)
        .new_topic_by_address(&raw)
        .await
        .unwrap();

    let IngestOutcome::Created { kind, id } = outcome else {
        panic!("expected a created outcome, got {:?}", outcome);
    };
    assert_eq!(kind, CreatedKind::Topic);
    let topic = Topic::get(id).await.unwrap().unwrap();
    assert_eq!(topic.board_id, board.id);

    let reloaded = Board::get(board.id).await.unwrap().unwrap();
    assert_eq!(reloaded.topic_count, 1);
}

#[tokio::test]
async fn unmapped_recipient_address_is_target_gone() {
    seed_member("lost-poster@sender.example", &[Permission::PostByEmail]).await;
    let raw = raw_email(
        "lost-poster@sender.example",
        &format!("nowhere@{HOST}"),
        "hello",
        "body",
    );
    let outcome = EmailGateway::new(GatewayConfig::default(), false)
        .new_topic_by_address(&raw)
        .await
        .unwrap();
    assert_eq!(outcome, IngestOutcome::Rejected(FailureKind::TargetGone));
}

#[tokio::test]
async fn forced_approval_holds_new_topics() {
    let member = seed_member(
        "held-poster@sender.example",
        &[Permission::PostNew, Permission::PostByEmail],
    )
    .await;
    let board = Board::new("Held", Some(format!("held@{HOST}")));
    board.save().await.unwrap();
    let _ = &member;

    let config = GatewayConfig {
        force_approval_for_new_topics: true,
        ..GatewayConfig::default()
    };
    let raw = raw_email(
        "held-poster@sender.example",
        &format!("held@{HOST}"),
        "Needs review",
        "content",
    );
    let outcome = EmailGateway::new(config, false)
        .new_topic_by_address(&raw)
        .await
        .unwrap();

    let IngestOutcome::Created { id, .. } = outcome else {
        panic!("expected a created outcome, got {:?}", outcome);
    };
    let topic = Topic::get(id).await.unwrap().unwrap();
    assert!(!topic.approved);
}

#[tokio::test]
async fn preview_renders_without_side_effects() {
    let before = failure_count().await;
    let raw = raw_email(
        "nobody@sender.example",
        "post+bogus-t123@forum.example",
        "Re: whatever",
        "Preview me, please: https://forum.example/t/1",
    );
    let preview = EmailGateway::new(GatewayConfig::default(), false).preview(&raw);

    assert!(preview.body.contains("Preview me, please"));
    assert!(preview.body.contains("[url]"));
    assert!(!preview.used_html);
    assert_eq!(
        preview.recipients,
        vec!["post+bogus-t123@forum.example".to_string()]
    );
    assert_eq!(preview.attachment_count, 0);
    assert_eq!(failure_count().await, before);
}

#[tokio::test]
async fn last_active_stamp_comes_from_the_date_header() {
    let member = seed_member("dated@sender.example", &[Permission::ReplyToAny]).await;
    let (_, topic) = seed_topic(&seed_member("starter11@sender.example", &[]).await).await;
    let address = issue_address(&member, MessageType::TopicReply, topic.id).await;

    let raw = format!(
        "From: dated@sender.example\r\n\
         To: {address}\r\n\
         Date: Tue, 12 Aug 2025 09:12:00 +0000\r\n\
         Subject: Re: Weekly sync\r\n\
         \r\n\
         Still around.\r\n"
    );
    let outcome = EmailGateway::new(GatewayConfig::default(), false)
        .reply_or_new_topic_by_key(raw.as_bytes(), false)
        .await
        .unwrap();
    assert!(matches!(outcome, IngestOutcome::Created { .. }));

    let reloaded = Member::get(member.id).await.unwrap().unwrap();
    assert_eq!(reloaded.last_active_at, 1_754_989_920_000);
}

// PMs append the disabled-attachment notice like replies and topics do.
#[tokio::test]
async fn pm_with_disabled_attachments_carries_the_notice() {
    use crate::modules::forum::pm::PmMessage;

    let sender = seed_member("pm-attach@sender.example", &[Permission::SendPm]).await;
    let other = seed_member("pm-attach-other@sender.example", &[Permission::SendPm]).await;
    let original = PmMessage::new(None, other.id, &other.display_name, sender.id, "Files", "body");
    original.save().await.unwrap();
    let address = issue_address(&sender, MessageType::PmReply, original.id).await;

    let raw = format!(
        "From: pm-attach@sender.example\r\n\
         To: {address}\r\n\
         Subject: Re: Files\r\n\
         Content-Type: multipart/mixed; boundary=\"m\"\r\n\
         \r\n\
         --m\r\n\
         Content-Type: text/plain\r\n\
         \r\n\
         Attached as discussed.\r\n\
         --m\r\n\
         Content-Type: application/pdf; name=\"plan.pdf\"\r\n\
         Content-Disposition: attachment; filename=\"plan.pdf\"\r\n\
         Content-Transfer-Encoding: base64\r\n\
         \r\n\
         JVBERi0xLjQ=\r\n\
         --m--\r\n"
    );

    let config = GatewayConfig {
        attachments_enabled: false,
        ..GatewayConfig::default()
    };
    let outcome = EmailGateway::new(config, false)
        .reply_or_new_topic_by_key(raw.as_bytes(), false)
        .await
        .unwrap();

    let IngestOutcome::Created { kind, id } = outcome else {
        panic!("expected a created outcome, got {:?}", outcome);
    };
    assert_eq!(kind, CreatedKind::PrivateMessage);
    let created = PmMessage::get(id).await.unwrap().unwrap();
    assert!(created.body.contains("could not be imported"));
}

#[tokio::test]
async fn pm_reply_lands_in_the_thread_and_marks_the_original() {
    use crate::modules::forum::pm::PmMessage;

    let sender = seed_member("pm-sender@sender.example", &[Permission::SendPm]).await;
    let other = seed_member("pm-other@sender.example", &[Permission::SendPm]).await;
    let original = PmMessage::new(None, other.id, &other.display_name, sender.id, "Question", "body");
    original.save().await.unwrap();

    let address = issue_address(&sender, MessageType::PmReply, original.id).await;
    let raw = raw_email(
        "pm-sender@sender.example",
        &address,
        "Re: Question",
        "Here is my answer.",
    );
    let outcome = EmailGateway::new(GatewayConfig::default(), false)
        .reply_or_new_topic_by_key(&raw, false)
        .await
        .unwrap();

    let IngestOutcome::Created { kind, id } = outcome else {
        panic!("expected a created outcome, got {:?}", outcome);
    };
    assert_eq!(kind, CreatedKind::PrivateMessage);

    let created = PmMessage::get(id).await.unwrap().unwrap();
    assert_eq!(created.thread_head_id, original.id);
    assert_eq!(created.recipient_id, other.id);

    let reloaded = PmMessage::get(original.id).await.unwrap().unwrap();
    assert!(reloaded.read);
    assert!(reloaded.replied);
}
