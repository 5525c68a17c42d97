use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    domain::{ChannelId, GuildId, MessageId, UserId},
    verdict::Verdict,
    Result,
};

/// One classification request: the feedback text plus up to the configured
/// number of image references (already filtered to image attachments).
#[derive(Clone, Debug)]
pub struct ClassifyRequest {
    pub text: String,
    pub image_urls: Vec<String>,
}

/// Hexagonal port for the external judgment service.
///
/// By contract this never fails: a malformed response degrades to the keyword
/// fallback inside the adapter, and a transport/auth failure fails open via
/// [`Verdict::fail_open`].
#[async_trait]
pub trait ClassifierPort: Send + Sync {
    async fn classify(&self, req: ClassifyRequest) -> Verdict;
}

/// What happened to a delete request. "Already gone" and "forbidden" are
/// modeled as outcomes rather than errors: both are non-fatal to the event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyGone,
    Forbidden,
}

/// Which mechanism ended up applying the mute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MuteMechanism {
    Native,
    RestFallback,
}

/// Hexagonal port for the chat platform's moderation surface.
///
/// The two mute methods are deliberately separate so the orchestrator owns
/// the native-then-REST fallback chain and can be tested against fakes.
#[async_trait]
pub trait PlatformPort: Send + Sync {
    async fn delete_message(&self, channel: ChannelId, message: MessageId)
        -> Result<DeleteOutcome>;

    /// Primary mute: the platform binding's own member-timeout call.
    async fn mute_member(
        &self,
        guild: GuildId,
        user: UserId,
        until: DateTime<Utc>,
        reason: &str,
    ) -> Result<()>;

    /// Fallback mute: a raw REST request with an explicit expiry timestamp
    /// and an audit-log reason.
    async fn mute_member_rest(
        &self,
        guild: GuildId,
        user: UserId,
        until: DateTime<Utc>,
        reason: &str,
    ) -> Result<()>;

    /// Private message to a user. Fails when the target has DMs closed.
    async fn send_direct_message(&self, user: UserId, text: &str) -> Result<()>;
}
