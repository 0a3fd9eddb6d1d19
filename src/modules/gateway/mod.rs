// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

//! The inbound gateway: sequences parsing, key authentication, the
//! permission matrices, body transformation, and content creation for the
//! three entry flows.

use poem_openapi::{Enum, Object};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::modules::content::{pm, reply, topic};
use crate::modules::email::{parser, InboundEmail, MessageType};
use crate::modules::error::{code::ErrorCode, MailBoardResult};
use crate::modules::forum::board::Board;
use crate::modules::forum::pm::PmMessage;
use crate::modules::forum::post::Post;
use crate::modules::forum::topic::Topic;
use crate::modules::gateway::failure::{FailureKind, FailureRecord};
use crate::modules::key::PostingKey;
use crate::modules::lang;
use crate::modules::member::Member;
use crate::modules::notification;
use crate::modules::permission::{self, AccessDecision, Permission};
use crate::modules::settings::system::SystemSetting;
use crate::modules::transform;
use crate::{raise_error, utc_now};

pub mod failure;
#[cfg(test)]
mod tests;

pub const GATEWAY_CONFIG: &str = "gateway-config";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize, Enum)]
pub enum MaintenanceMode {
    #[default]
    Off,
    /// Maintenance announced, but email posting keeps working for everyone.
    AdminRelaxed,
    /// Only administrators may post.
    Full,
}

/// Every flag the gateway consults, passed in explicitly at construction.
/// Persisted as JSON in a `SystemSetting` row and editable over the admin
/// API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Object)]
pub struct GatewayConfig {
    /// Master switch for the whole inbound gateway.
    pub email_posting_enabled: bool,
    pub reply_by_email_enabled: bool,
    pub pm_by_email_enabled: bool,
    pub attachments_enabled: bool,
    /// On a bounce, disable the sender's notifications automatically.
    pub bounce_auto_disable: bool,
    /// When auto-disable is on, additionally record the bounce as a failure.
    /// With auto-disable off bounces are always recorded.
    pub bounce_record_anyway: bool,
    pub maintenance: MaintenanceMode,
    /// A changed subject on a message reply starts a new topic instead.
    pub subject_change_starts_new_topic: bool,
    /// Overrides approved new-topic outcomes to pending.
    pub force_approval_for_new_topics: bool,
    /// Forum-wide post-moderation: unapproved grants become usable.
    pub post_moderation_active: bool,
    /// Language tag for localized reply prefixes when the member has none.
    pub default_language: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            email_posting_enabled: true,
            reply_by_email_enabled: true,
            pm_by_email_enabled: true,
            attachments_enabled: true,
            bounce_auto_disable: true,
            bounce_record_anyway: false,
            maintenance: MaintenanceMode::Off,
            subject_change_starts_new_topic: true,
            force_approval_for_new_topics: false,
            post_moderation_active: false,
            default_language: lang::DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl GatewayConfig {
    pub fn load() -> MailBoardResult<GatewayConfig> {
        match SystemSetting::get_existing_value(GATEWAY_CONFIG)? {
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                raise_error!(
                    format!("Corrupt gateway config: {}", e),
                    ErrorCode::InternalError
                )
            }),
            None => Ok(GatewayConfig::default()),
        }
    }

    pub async fn store(&self) -> MailBoardResult<()> {
        let json = serde_json::to_string(self)
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        SystemSetting::save_value(GATEWAY_CONFIG, json).await
    }
}

/// What a unit of work produced.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IngestOutcome {
    Created { kind: CreatedKind, id: u64 },
    /// Recorded via the failure sink (except the documented bounce cases).
    Rejected(FailureKind),
    /// Configuration no-op or empty payload. Nothing recorded.
    Ignored,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CreatedKind {
    Reply,
    Topic,
    PrivateMessage,
}

/// Read-only result of the preview flow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Object)]
pub struct EmailPreview {
    /// Transformed body markup; empty when nothing usable was found.
    pub body: String,
    pub used_html: bool,
    pub recipients: Vec<String>,
    pub attachment_count: u32,
}

/// External veto extension point, run after the target is resolved and
/// before content creation.
pub type VetoCheck = fn(&InboundEmail, &Member) -> Option<FailureKind>;

pub struct EmailGateway {
    config: GatewayConfig,
    /// True when the invoking session is an authenticated administrator
    /// (admin API calls). The spool task runs with false.
    acting_admin: bool,
    vetoes: Vec<VetoCheck>,
}

impl EmailGateway {
    pub fn new(config: GatewayConfig, acting_admin: bool) -> Self {
        Self {
            config,
            acting_admin,
            vetoes: Vec::new(),
        }
    }

    pub fn with_veto(mut self, check: VetoCheck) -> Self {
        self.vetoes.push(check);
        self
    }

    /// The key-bearing flow: topic replies, message replies, and PM replies,
    /// plus the subject-change escape hatch into topic creation.
    pub async fn reply_or_new_topic_by_key(
        &self,
        raw: &[u8],
        force_override: bool,
    ) -> MailBoardResult<IngestOutcome> {
        if !self.config.email_posting_enabled {
            return Ok(IngestOutcome::Ignored);
        }

        let email = parser::parse(raw);
        if email.is_empty() {
            debug!("inbound payload parsed to nothing, ignoring");
            return Ok(IngestOutcome::Ignored);
        }

        if email.bounce {
            return self.handle_bounce(&email, raw).await;
        }

        if !self.config.reply_by_email_enabled && !self.config.pm_by_email_enabled {
            return self
                .reject(
                    FailureKind::FeatureDisabled,
                    "Reply by email and PM by email are both disabled",
                    &email,
                    raw,
                )
                .await;
        }

        if email.spam && !force_override {
            return self
                .reject(FailureKind::SpamDetected, "Flagged as spam", &email, raw)
                .await;
        }

        let Some(sender_address) = email.sender_address() else {
            return self
                .reject(
                    FailureKind::MemberNotFound,
                    "Email carries no sender address",
                    &email,
                    raw,
                )
                .await;
        };
        let Some(member) = Member::find_by_email(sender_address).await? else {
            return self
                .reject(
                    FailureKind::MemberNotFound,
                    &format!("No member for sender address '{}'", sender_address),
                    &email,
                    raw,
                )
                .await;
        };

        if email.key.is_empty() {
            return self
                .reject(
                    FailureKind::MissingKey,
                    "No posting key in the recipient address",
                    &email,
                    raw,
                )
                .await;
        }

        let is_pm = email.message_type == MessageType::PmReply;
        let posting_key = PostingKey::resolve(&email.key).await?;
        if posting_key.is_none() && !force_override {
            // A legitimately consumed key and a forged one look the same
            // here; the log line below is what lets an operator tell a
            // duplicate delivery from an attack.
            let message = if is_pm {
                "Posting key not found for private message reply"
            } else {
                "Posting key not found for topic reply"
            };
            return self.reject(FailureKind::KeyNotFound, message, &email, raw).await;
        }
        if let Some(posting_key) = &posting_key {
            if !posting_key.member_email.eq_ignore_ascii_case(sender_address)
                && !force_override
            {
                return self
                    .reject(
                        FailureKind::SenderKeyMismatch,
                        &format!(
                            "Key was issued to '{}', email came from '{}'",
                            posting_key.member_email, sender_address
                        ),
                        &email,
                        raw,
                    )
                    .await;
            }
            // The stored row is authoritative for what the key authorizes;
            // an address pointing anywhere else is treated as an unknown
            // key, and the key stays unconsumed.
            if (posting_key.message_type != email.message_type
                || posting_key.target_id != email.target_id)
                && !force_override
            {
                debug!(
                    authorized_type = ?posting_key.message_type,
                    authorized_target = posting_key.target_id,
                    addressed_type = ?email.message_type,
                    addressed_target = email.target_id,
                    "posting key does not cover the addressed target"
                );
                let message = if is_pm {
                    "Posting key not found for private message reply"
                } else {
                    "Posting key not found for topic reply"
                };
                return self.reject(FailureKind::KeyNotFound, message, &email, raw).await;
            }
        }

        if let Some(outcome) = self.maintenance_block(&member, &email, raw).await? {
            return Ok(outcome);
        }

        let language = member
            .language
            .clone()
            .unwrap_or_else(|| self.config.default_language.clone());

        let outcome = match email.message_type {
            MessageType::TopicReply | MessageType::MessageReply => {
                self.dispatch_reply(&email, &member, &language, raw).await?
            }
            MessageType::PmReply => self.dispatch_pm(&email, &member, &language, raw).await?,
            MessageType::NewTopicByAddress | MessageType::Unknown => {
                // A key was present but the address tag is unusable.
                self.reject(
                    FailureKind::MissingKey,
                    "Recipient address carries no usable reply tag",
                    &email,
                    raw,
                )
                .await?
            }
        };

        if let IngestOutcome::Created { .. } = outcome {
            if let Some(posting_key) = &posting_key {
                // Idempotent: duplicate delivery loses the race here and the
                // second attempt is a quiet no-op.
                let consumed = PostingKey::invalidate(&posting_key.key).await?;
                debug!(consumed, key = %posting_key.key, "posting key invalidated");
            }
            Member::touch_last_active(member.id, email.date.unwrap_or_else(|| utc_now!()))
                .await?;
        }
        Ok(outcome)
    }

    /// Routes a raw payload to the flow its recipient address selects:
    /// plus-addressed recipients carry a key, anything else can only be a
    /// board submission. Used by the spool scanner and the admin retry.
    pub async fn ingest(&self, raw: &[u8], force_override: bool) -> MailBoardResult<IngestOutcome> {
        let email = parser::parse(raw);
        match email.message_type {
            MessageType::Unknown | MessageType::NewTopicByAddress => {
                self.new_topic_by_address(raw).await
            }
            _ => self.reply_or_new_topic_by_key(raw, force_override).await,
        }
    }

    /// The address flow: the recipient address maps one-to-one to a board,
    /// and the email starts a new topic there.
    pub async fn new_topic_by_address(&self, raw: &[u8]) -> MailBoardResult<IngestOutcome> {
        if !self.config.email_posting_enabled {
            return Ok(IngestOutcome::Ignored);
        }

        let mut email = parser::parse(raw);
        if email.is_empty() {
            return Ok(IngestOutcome::Ignored);
        }
        email.message_type = MessageType::NewTopicByAddress;

        if email.bounce {
            return self.handle_bounce(&email, raw).await;
        }
        if email.spam {
            return self
                .reject(FailureKind::SpamDetected, "Flagged as spam", &email, raw)
                .await;
        }

        let Some(sender_address) = email.sender_address() else {
            return self
                .reject(
                    FailureKind::MemberNotFound,
                    "Email carries no sender address",
                    &email,
                    raw,
                )
                .await;
        };
        let Some(member) = Member::find_by_email(sender_address).await? else {
            return self
                .reject(
                    FailureKind::MemberNotFound,
                    &format!("No member for sender address '{}'", sender_address),
                    &email,
                    raw,
                )
                .await;
        };

        let mut board = None;
        for recipient in &email.recipients {
            if let Some(address) = recipient.address.as_deref() {
                if let Some(found) = Board::find_by_address(address).await? {
                    board = Some(found);
                    break;
                }
            }
        }
        let Some(board) = board else {
            return self
                .reject(
                    FailureKind::TargetGone,
                    "No board accepts mail at the recipient address",
                    &email,
                    raw,
                )
                .await;
        };

        if let Some(outcome) = self.maintenance_block(&member, &email, raw).await? {
            return Ok(outcome);
        }
        if let Some(outcome) = self.run_vetoes(&email, &member, raw).await? {
            return Ok(outcome);
        }

        let outcome = self.create_topic_from(&email, &member, &board, raw).await?;
        if let IngestOutcome::Created { .. } = outcome {
            Member::touch_last_active(member.id, email.date.unwrap_or_else(|| utc_now!()))
                .await?;
        }
        Ok(outcome)
    }

    /// Read-only flow for moderation tooling: parse and transform only.
    /// No authentication, no persistence, no failure records.
    pub fn preview(&self, raw: &[u8]) -> EmailPreview {
        let email = parser::parse(raw);
        let rendered = transform::render(&email, true);
        EmailPreview {
            body: rendered
                .as_ref()
                .map(|r| r.markup.clone())
                .unwrap_or_default(),
            used_html: rendered.map(|r| r.used_html).unwrap_or(false),
            recipients: email
                .recipients
                .iter()
                .filter_map(|addr| addr.address.clone())
                .collect(),
            attachment_count: email.attachments.len() as u32,
        }
    }

    async fn dispatch_reply(
        &self,
        email: &InboundEmail,
        member: &Member,
        language: &str,
        raw: &[u8],
    ) -> MailBoardResult<IngestOutcome> {
        if !self.config.reply_by_email_enabled {
            return self
                .reject(
                    FailureKind::FeatureDisabled,
                    "Reply by email is disabled",
                    email,
                    raw,
                )
                .await;
        }

        let topic = match email.message_type {
            MessageType::TopicReply => Topic::get(email.target_id).await?,
            MessageType::MessageReply => match Post::get(email.target_id).await? {
                Some(post) => Topic::get(post.topic_id).await?,
                None => None,
            },
            _ => None,
        };
        let Some(topic) = topic else {
            return self
                .reject(
                    FailureKind::TargetGone,
                    "The topic this reply targets no longer exists",
                    email,
                    raw,
                )
                .await;
        };
        let Some(board) = Board::get(topic.board_id).await? else {
            return self
                .reject(
                    FailureKind::TargetGone,
                    "The board this reply targets no longer exists",
                    email,
                    raw,
                )
                .await;
        };

        if let Some(outcome) = self.run_vetoes(email, member, raw).await? {
            return Ok(outcome);
        }

        // Subject-change escape hatch: a renamed message reply means the
        // sender wants a new topic on the same board.
        if self.config.subject_change_starts_new_topic
            && email.message_type == MessageType::MessageReply
        {
            let incoming = lang::strip_reply_prefix(&email.subject);
            let stored = lang::strip_reply_prefix(&topic.subject);
            if !incoming.is_empty() && incoming != stored {
                info!(topic_id = topic.id, "subject changed, re-routing to topic creation");
                return self.create_topic_from(email, member, &board, raw).await;
            }
        }

        if topic.locked && !member.is_admin && !member.has(Permission::ModerateBoard) {
            return self
                .reject(
                    FailureKind::TopicLocked,
                    "The target topic is locked",
                    email,
                    raw,
                )
                .await;
        }

        let decision = permission::check_reply(member, &topic, &self.config);
        let approved = match decision {
            AccessDecision::Approved => true,
            AccessDecision::Pending => false,
            AccessDecision::Denied => {
                return self
                    .reject(
                        FailureKind::PermissionDenied,
                        "Sender may not reply to this topic",
                        email,
                        raw,
                    )
                    .await;
            }
        };

        let Some(rendered) = transform::render(email, true) else {
            return self
                .reject(
                    FailureKind::NoMessageBody,
                    "Message body is empty after transformation",
                    email,
                    raw,
                )
                .await;
        };

        let post_id = reply::create_reply(reply::ReplyRequest {
            topic: &topic,
            board: &board,
            subject: lang::apply_reply_prefix(language, &topic.subject),
            body: rendered.markup,
            email,
            member,
            approved,
            ip: None,
            config: &self.config,
        })
        .await?;

        Ok(IngestOutcome::Created {
            kind: CreatedKind::Reply,
            id: post_id,
        })
    }

    async fn dispatch_pm(
        &self,
        email: &InboundEmail,
        member: &Member,
        language: &str,
        raw: &[u8],
    ) -> MailBoardResult<IngestOutcome> {
        if !self.config.pm_by_email_enabled {
            return self
                .reject(
                    FailureKind::FeatureDisabled,
                    "PM by email is disabled",
                    email,
                    raw,
                )
                .await;
        }

        let Some(original) = PmMessage::get(email.target_id).await? else {
            return self
                .reject(
                    FailureKind::TargetGone,
                    "The private message this reply targets no longer exists",
                    email,
                    raw,
                )
                .await;
        };

        if let Some(outcome) = self.run_vetoes(email, member, raw).await? {
            return Ok(outcome);
        }

        if permission::check_send_pm(member) == AccessDecision::Denied {
            return self
                .reject(
                    FailureKind::PermissionDenied,
                    "Sender may not send private messages",
                    email,
                    raw,
                )
                .await;
        }

        let Some(rendered) = transform::render(email, true) else {
            return self
                .reject(
                    FailureKind::NoMessageBody,
                    "Private message body is empty after transformation",
                    email,
                    raw,
                )
                .await;
        };

        let pm_id = pm::create_private_message(pm::PmRequest {
            original: &original,
            subject: lang::apply_reply_prefix(language, &original.subject),
            body: rendered.markup,
            email,
            sender: member,
            config: &self.config,
        })
        .await?;

        Ok(IngestOutcome::Created {
            kind: CreatedKind::PrivateMessage,
            id: pm_id,
        })
    }

    async fn create_topic_from(
        &self,
        email: &InboundEmail,
        member: &Member,
        board: &Board,
        raw: &[u8],
    ) -> MailBoardResult<IngestOutcome> {
        let decision = permission::check_new_topic(member, &self.config);
        let approved = match decision {
            AccessDecision::Approved => true,
            AccessDecision::Pending => false,
            AccessDecision::Denied => {
                return self
                    .reject(
                        FailureKind::PermissionDenied,
                        "Sender may not start topics on this board",
                        email,
                        raw,
                    )
                    .await;
            }
        };

        let subject = lang::strip_reply_prefix(&email.subject);
        if subject.is_empty() {
            return self
                .reject(FailureKind::NoSubject, "Email has no subject", email, raw)
                .await;
        }

        let Some(rendered) = transform::render(email, true) else {
            return self
                .reject(
                    FailureKind::NoMessageBody,
                    "Message body is empty after transformation",
                    email,
                    raw,
                )
                .await;
        };

        let topic_id = topic::create_topic(topic::TopicRequest {
            board,
            subject,
            body: rendered.markup,
            email,
            member,
            approved,
            ip: None,
            config: &self.config,
        })
        .await?;

        Ok(IngestOutcome::Created {
            kind: CreatedKind::Topic,
            id: topic_id,
        })
    }

    /// Bounce policy, preserved exactly: with auto-disable on, the sender's
    /// notifications are disabled and the bounce is recorded only when
    /// `bounce_record_anyway` is set; with auto-disable off, the bounce is
    /// always recorded.
    async fn handle_bounce(
        &self,
        email: &InboundEmail,
        raw: &[u8],
    ) -> MailBoardResult<IngestOutcome> {
        if self.config.bounce_auto_disable {
            if let Some(sender) = email.sender_address() {
                if let Some(member) = Member::find_by_email(sender).await? {
                    notification::disable_for_member(member.id).await?;
                    info!(member_id = member.id, "bounce: notifications disabled");
                }
            }
            if self.config.bounce_record_anyway {
                FailureRecord::record(FailureKind::Bounced, "Delivery status notification", email, raw)
                    .await?;
            }
        } else {
            FailureRecord::record(FailureKind::Bounced, "Delivery status notification", email, raw)
                .await?;
        }
        Ok(IngestOutcome::Rejected(FailureKind::Bounced))
    }

    async fn maintenance_block(
        &self,
        member: &Member,
        email: &InboundEmail,
        raw: &[u8],
    ) -> MailBoardResult<Option<IngestOutcome>> {
        if self.config.maintenance == MaintenanceMode::Full
            && !member.is_admin
            && !self.acting_admin
        {
            let outcome = self
                .reject(
                    FailureKind::MaintenanceMode,
                    "The forum is in maintenance mode",
                    email,
                    raw,
                )
                .await?;
            return Ok(Some(outcome));
        }
        Ok(None)
    }

    async fn run_vetoes(
        &self,
        email: &InboundEmail,
        member: &Member,
        raw: &[u8],
    ) -> MailBoardResult<Option<IngestOutcome>> {
        for veto in &self.vetoes {
            if let Some(kind) = veto(email, member) {
                let outcome = self
                    .reject(kind, "Rejected by an external check", email, raw)
                    .await?;
                return Ok(Some(outcome));
            }
        }
        Ok(None)
    }

    async fn reject(
        &self,
        kind: FailureKind,
        message: &str,
        email: &InboundEmail,
        raw: &[u8],
    ) -> MailBoardResult<IngestOutcome> {
        FailureRecord::record(kind, message, email, raw).await?;
        Ok(IngestOutcome::Rejected(kind))
    }
}
