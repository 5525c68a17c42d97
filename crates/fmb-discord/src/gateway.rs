//! Gateway wiring: serenity event handler + dispatcher.
//!
//! Each inbound event is handled to completion independently; the only state
//! shared across events is the read-only config and the port wiring.

use std::sync::Arc;

use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::event::MessageUpdateEvent;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tracing::{error, info};

use fmb_core::{
    config::Config,
    domain::{Attachment, ChannelId, FeedbackAuthor, FeedbackEvent, GuildId, MessageId, UserId},
    moderation::{edit_requires_reprocessing, Moderator},
    report::format_mute_duration,
};

use crate::commands;

pub struct Handler {
    cfg: Arc<Config>,
    moderator: Arc<Moderator>,
}

impl Handler {
    pub fn new(cfg: Arc<Config>, moderator: Arc<Moderator>) -> Self {
        Self { cfg, moderator }
    }

    fn to_feedback(&self, msg: &Message, previous_text: Option<String>) -> FeedbackEvent {
        FeedbackEvent {
            author: FeedbackAuthor {
                id: UserId(msg.author.id.get()),
                display_name: msg.author.tag(),
                is_bot: msg.author.bot,
            },
            channel_id: ChannelId(msg.channel_id.get()),
            guild_id: msg
                .guild_id
                .map(|g| GuildId(g.get()))
                .unwrap_or(self.cfg.guild_id),
            message_id: MessageId(msg.id.get()),
            text: msg.content.clone(),
            attachments: msg
                .attachments
                .iter()
                .map(|a| Attachment {
                    url: a.url.clone(),
                    filename: a.filename.clone(),
                })
                .collect(),
            previous_text,
        }
    }

    async fn moderate(&self, msg: &Message, previous_text: Option<String>) {
        let event = self.to_feedback(msg, previous_text);
        if let Some(outcome) = self.moderator.process(event).await {
            info!(
                classification = outcome.verdict.classification.label(),
                delete = ?outcome.delete,
                mute = ?outcome.mute,
                author_notified = outcome.author_notified,
                overseer_notified = outcome.overseer_notified,
                "feedback event acted on"
            );
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(bot = %ready.user.name, "bot connected");
        info!(
            feedback_channel = self.cfg.feedback_channel_id.0,
            overseer = self.cfg.overseer_id.0,
            guild = self.cfg.guild_id.0,
            mute_risk = %format_mute_duration(self.cfg.mute_risk),
            mute_negative = %format_mute_duration(self.cfg.mute_negative),
            "monitoring feedback channel"
        );
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.content.starts_with('!')
            && commands::handle_command(&ctx, &msg, &self.cfg, &self.moderator).await
        {
            return;
        }

        self.moderate(&msg, None).await;
    }

    async fn message_update(
        &self,
        ctx: Context,
        old: Option<Message>,
        new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        // Cache miss on the updated message: fetch it so edits are never lost.
        let new = match new {
            Some(m) => m,
            None => match event.channel_id.message(&ctx.http, event.id).await {
                Ok(m) => m,
                Err(e) => {
                    error!(message = event.id.get(), error = %e, "failed to fetch edited message");
                    return;
                }
            },
        };

        // Re-enter the pipeline only when the edit actually changed something.
        if let Some(old) = &old {
            let before = self.to_feedback(old, None);
            let after = self.to_feedback(&new, None);
            if !edit_requires_reprocessing(&before, &after) {
                return;
            }
        }

        info!(author = %new.author.tag(), "edited message detected");
        let previous_text = old.map(|m| m.content).unwrap_or_default();
        self.moderate(&new, Some(previous_text)).await;
    }
}

/// Connect to the gateway and dispatch events until shutdown.
pub async fn run(cfg: Arc<Config>, moderator: Arc<Moderator>) -> anyhow::Result<()> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&cfg.discord_token, intents)
        .event_handler(Handler::new(cfg.clone(), moderator))
        .await?;

    client.start().await?;
    Ok(())
}
