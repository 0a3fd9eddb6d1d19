// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use tracing::info;

use crate::modules::content::{apply_attachment_plan, plan_attachments, store_attachments};
use crate::modules::email::InboundEmail;
use crate::modules::error::MailBoardResult;
use crate::modules::forum::board::Board;
use crate::modules::forum::post::Post;
use crate::modules::forum::topic::Topic;
use crate::modules::gateway::GatewayConfig;
use crate::modules::member::Member;
use crate::modules::notification::{self, NotificationKind, Subscription};

pub struct TopicRequest<'a> {
    pub board: &'a Board,
    /// Subject without any reply prefix.
    pub subject: String,
    /// Transformed body markup.
    pub body: String,
    pub email: &'a InboundEmail,
    pub member: &'a Member,
    pub approved: bool,
    pub ip: Option<String>,
    pub config: &'a GatewayConfig,
}

/// Persists a new topic with its opening post, subscribes the starter, and
/// queues board-level notifications when the topic is immediately visible.
pub async fn create_topic(request: TopicRequest<'_>) -> MailBoardResult<u64> {
    let mut body = request.body;
    let plan = plan_attachments(
        &request.email.attachments,
        request.member,
        request.approved,
        request.config,
    );
    let store = apply_attachment_plan(plan, &mut body);

    let mut topic = Topic::new(
        request.board.id,
        &request.subject,
        request.member.id,
        &request.member.display_name,
    );
    topic.approved = request.approved;
    topic.save().await?;

    let post = Post::new(
        topic.id,
        request.board.id,
        &request.subject,
        &body,
        request.member.id,
        &request.member.display_name,
        &request.member.email,
        request.approved,
        request.ip,
    );
    post.save().await?;

    if store {
        store_attachments(post.id, &request.email.attachments, request.approved).await?;
    }

    Board::record_post(request.board.id, true).await?;
    if request.board.count_posts {
        Member::increment_post_count(request.member.id).await?;
    }

    Subscription::subscribe(request.member.id, topic.id).await?;
    if request.approved {
        notification::notify(request.board.id, NotificationKind::NewTopic, request.member.id)
            .await?;
    }

    info!(
        topic_id = topic.id,
        board_id = request.board.id,
        approved = request.approved,
        "topic created from email"
    );
    Ok(topic.id)
}
