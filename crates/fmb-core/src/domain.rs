/// Discord user id (numeric snowflake).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub u64);

/// Discord channel id (numeric snowflake).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChannelId(pub u64);

/// Discord message id (numeric snowflake).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub u64);

/// Discord guild (server) id (numeric snowflake).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GuildId(pub u64);

/// Message author as captured from the gateway event.
#[derive(Clone, Debug)]
pub struct FeedbackAuthor {
    pub id: UserId,
    /// Display name used in reports (`name#discriminator` or the global name).
    pub display_name: String,
    pub is_bot: bool,
}

/// One message attachment (URL + original filename).
#[derive(Clone, Debug)]
pub struct Attachment {
    pub url: String,
    pub filename: String,
}

impl Attachment {
    /// Attachments with these extensions are forwarded to the classifier.
    /// Everything else is still counted in the overseer report.
    pub fn is_image(&self) -> bool {
        const IMAGE_EXTENSIONS: [&str; 5] = [".png", ".jpg", ".jpeg", ".gif", ".webp"];
        let lower = self.filename.to_lowercase();
        IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
    }
}

/// A single inbound feedback message, new or edited.
///
/// Captured once from the gateway event and immutable afterwards; nothing is
/// persisted once processing of the event finishes.
#[derive(Clone, Debug)]
pub struct FeedbackEvent {
    pub author: FeedbackAuthor,
    pub channel_id: ChannelId,
    pub guild_id: GuildId,
    pub message_id: MessageId,
    pub text: String,
    pub attachments: Vec<Attachment>,
    /// `Some(previous text)` when this event is a message edit.
    pub previous_text: Option<String>,
}

impl FeedbackEvent {
    pub fn is_edit(&self) -> bool {
        self.previous_text.is_some()
    }

    /// URLs of image attachments, in message order.
    pub fn image_urls(&self) -> Vec<String> {
        self.attachments
            .iter()
            .filter(|a| a.is_image())
            .map(|a| a.url.clone())
            .collect()
    }
}
