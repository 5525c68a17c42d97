//! `PlatformPort` implementation over Discord's API.
//!
//! Deletes and the primary mute go through serenity's HTTP client; the mute
//! fallback is a raw REST `PATCH` against the guild-member endpoint with an
//! explicit expiry timestamp and an audit-log reason header.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use serenity::builder::EditMember;
use serenity::http::Http;
use tracing::{debug, info};

use fmb_core::{
    domain::{ChannelId, GuildId, MessageId, UserId},
    errors::Error,
    ports::{DeleteOutcome, PlatformPort},
    Result,
};

const API_BASE: &str = "https://discord.com/api/v10";

pub struct DiscordPlatform {
    http: Arc<Http>,
    rest: reqwest::Client,
    token: String,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>, token: impl Into<String>) -> Self {
        let rest = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("reqwest client build");
        Self {
            http,
            rest,
            token: token.into(),
        }
    }

    fn map_err(e: serenity::Error) -> Error {
        Error::Platform(format!("discord error: {e}"))
    }

    /// HTTP status behind a serenity error, when the request reached Discord.
    fn http_status(e: &serenity::Error) -> Option<u16> {
        if let serenity::Error::Http(serenity::http::HttpError::UnsuccessfulRequest(resp)) = e {
            return Some(resp.status_code.as_u16());
        }
        None
    }
}

fn member_endpoint(guild: GuildId, user: UserId) -> String {
    format!("{API_BASE}/guilds/{}/members/{}", guild.0, user.0)
}

fn mute_payload(until: DateTime<Utc>) -> Value {
    json!({
        "communication_disabled_until": until.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

#[async_trait]
impl PlatformPort for DiscordPlatform {
    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<DeleteOutcome> {
        let channel = serenity::model::id::ChannelId::new(channel.0);
        let message = serenity::model::id::MessageId::new(message.0);

        match channel.delete_message(&*self.http, message).await {
            Ok(()) => {
                info!(message = message.get(), "message deleted");
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) => match Self::http_status(&e) {
                // Someone else got there first; not an error.
                Some(404) => Ok(DeleteOutcome::AlreadyGone),
                Some(403) => Ok(DeleteOutcome::Forbidden),
                _ => Err(Self::map_err(e)),
            },
        }
    }

    async fn mute_member(
        &self,
        guild: GuildId,
        user: UserId,
        until: DateTime<Utc>,
        reason: &str,
    ) -> Result<()> {
        let ts = serenity::model::Timestamp::from_unix_timestamp(until.timestamp())
            .map_err(|e| Error::Platform(format!("invalid mute expiry: {e}")))?;

        let edit = EditMember::new()
            .disable_communication_until_datetime(ts)
            .audit_log_reason(reason);

        serenity::model::id::GuildId::new(guild.0)
            .edit_member(&*self.http, serenity::model::id::UserId::new(user.0), edit)
            .await
            .map_err(Self::map_err)?;

        info!(user = user.0, %until, "member muted via native call");
        Ok(())
    }

    async fn mute_member_rest(
        &self,
        guild: GuildId,
        user: UserId,
        until: DateTime<Utc>,
        reason: &str,
    ) -> Result<()> {
        let resp = self
            .rest
            .patch(member_endpoint(guild, user))
            .header("Authorization", format!("Bot {}", self.token))
            .header("X-Audit-Log-Reason", reason)
            .json(&mute_payload(until))
            .send()
            .await
            .map_err(|e| Error::Platform(format!("rest mute request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Platform(format!(
                "rest mute failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        info!(user = user.0, %until, "member muted via REST fallback");
        Ok(())
    }

    async fn send_direct_message(&self, user: UserId, text: &str) -> Result<()> {
        let channel = serenity::model::id::UserId::new(user.0)
            .create_dm_channel(&*self.http)
            .await
            .map_err(Self::map_err)?;

        channel
            .id
            .say(&*self.http, text)
            .await
            .map_err(Self::map_err)?;

        debug!(user = user.0, "direct message sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn member_endpoint_targets_the_guild_member() {
        assert_eq!(
            member_endpoint(GuildId(7), UserId(42)),
            "https://discord.com/api/v10/guilds/7/members/42"
        );
    }

    #[test]
    fn mute_payload_carries_iso8601_expiry() {
        let until = Utc.with_ymd_and_hms(2026, 3, 14, 16, 0, 0).unwrap();
        let payload = mute_payload(until);
        assert_eq!(
            payload["communication_disabled_until"].as_str().unwrap(),
            "2026-03-14T16:00:00.000Z"
        );
    }
}
