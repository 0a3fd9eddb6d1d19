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

pub struct ReplyRequest<'a> {
    pub topic: &'a Topic,
    pub board: &'a Board,
    /// Subject with the localized reply prefix already applied.
    pub subject: String,
    /// Transformed body markup.
    pub body: String,
    pub email: &'a InboundEmail,
    pub member: &'a Member,
    pub approved: bool,
    pub ip: Option<String>,
    pub config: &'a GatewayConfig,
}

/// Persists a reply post with all its bookkeeping: attachment gating,
/// topic/board counters, poster post count (where the board counts posts),
/// subscription and notification fan-out.
pub async fn create_reply(request: ReplyRequest<'_>) -> MailBoardResult<u64> {
    let mut body = request.body;
    let plan = plan_attachments(
        &request.email.attachments,
        request.member,
        request.approved,
        request.config,
    );
    let store = apply_attachment_plan(plan, &mut body);

    let post = Post::new(
        request.topic.id,
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

    Topic::record_reply(request.topic.id).await?;
    Board::record_post(request.board.id, false).await?;
    if request.board.count_posts {
        Member::increment_post_count(request.member.id).await?;
    }

    Subscription::subscribe(request.member.id, request.topic.id).await?;
    if request.approved {
        notification::notify(request.topic.id, NotificationKind::TopicReply, request.member.id)
            .await?;
    }

    info!(
        post_id = post.id,
        topic_id = request.topic.id,
        approved = request.approved,
        "reply created from email"
    );
    Ok(post.id)
}
