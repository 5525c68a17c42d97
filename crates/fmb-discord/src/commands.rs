//! Privileged admin command surface (`!` prefix, administrator-only):
//! `!status`, `!testar <texto>`, `!testtimeout @membro [minutos]`.

use std::{sync::Arc, time::Duration};

use serenity::model::channel::Message;
use serenity::model::{id::RoleId, Permissions};
use serenity::prelude::*;
use tracing::warn;

use fmb_core::{
    config::Config,
    domain::{GuildId, UserId},
    moderation::{Moderator, MuteResult},
    ports::ClassifyRequest,
    report::{format_mute_duration, truncate_chars},
};

/// Dispatch an admin command. Returns `false` when the text is not one of the
/// known commands or the author is not an administrator, so the caller falls
/// through to feedback moderation.
pub async fn handle_command(
    ctx: &Context,
    msg: &Message,
    cfg: &Arc<Config>,
    moderator: &Arc<Moderator>,
) -> bool {
    let (cmd, rest) = parse_command(&msg.content);
    if !matches!(cmd.as_str(), "status" | "testar" | "testtimeout") {
        return false;
    }

    if !is_admin(ctx, msg, cfg).await {
        say(ctx, msg, "❌ Comando restrito a administradores.").await;
        // Not executed: the message still goes through moderation.
        return false;
    }

    match cmd.as_str() {
        "status" => status(ctx, msg, cfg).await,
        "testar" => test_classification(ctx, msg, moderator, &rest).await,
        "testtimeout" => test_timeout(ctx, msg, cfg, moderator, &rest).await,
        _ => {}
    }

    true
}

fn parse_command(text: &str) -> (String, String) {
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first.trim_start_matches('!').to_lowercase();
    (cmd, rest)
}

/// Administrator check via cached guild permissions; on a cache miss the
/// guild's roles are fetched over HTTP and scanned for the administrator bit.
/// Only when that lookup also fails does the configured overseer id decide.
async fn is_admin(ctx: &Context, msg: &Message, cfg: &Arc<Config>) -> bool {
    let Some(guild_id) = msg.guild_id else {
        return false;
    };
    let Ok(member) = guild_id.member(&ctx.http, msg.author.id).await else {
        return false;
    };

    if let Some(guild) = msg.guild(&ctx.cache) {
        return guild.member_permissions(&member).administrator();
    }

    match guild_id.to_partial_guild(&ctx.http).await {
        Ok(guild) => {
            guild.owner_id == msg.author.id
                || any_admin_role(&member.roles, |id| guild.roles.get(id).map(|r| r.permissions))
        }
        Err(e) => {
            warn!(error = %e, "guild permission lookup failed");
            msg.author.id.get() == cfg.overseer_id.0
        }
    }
}

fn any_admin_role(
    role_ids: &[RoleId],
    permissions_of: impl Fn(&RoleId) -> Option<Permissions>,
) -> bool {
    role_ids
        .iter()
        .any(|id| permissions_of(id).is_some_and(|p| p.administrator()))
}

async fn say(ctx: &Context, msg: &Message, text: impl Into<String>) {
    if let Err(e) = msg.channel_id.say(&ctx.http, text.into()).await {
        warn!(error = %e, "command reply failed");
    }
}

async fn status(ctx: &Context, msg: &Message, cfg: &Arc<Config>) {
    let text = format!(
        "🤖 **Status do Bot de Moderação**\n\
         • Estado: ✅ Online\n\
         • Canal Monitorado: <#{channel}>\n\
         • Líder: <@{overseer}>\n\
         • Timeout Médio: {risk}\n\
         • Timeout Negativo: {negative}\n\
         • Servidor: {guild}",
        channel = cfg.feedback_channel_id.0,
        overseer = cfg.overseer_id.0,
        risk = format_mute_duration(cfg.mute_risk),
        negative = format_mute_duration(cfg.mute_negative),
        guild = cfg.guild_id.0,
    );
    say(ctx, msg, text).await;
}

async fn test_classification(ctx: &Context, msg: &Message, moderator: &Arc<Moderator>, rest: &str) {
    if rest.is_empty() {
        say(ctx, msg, "Uso: `!testar <texto>`").await;
        return;
    }

    say(ctx, msg, "🤖 Analisando texto...").await;

    let verdict = moderator
        .classifier()
        .classify(ClassifyRequest {
            text: rest.to_string(),
            image_urls: vec![],
        })
        .await;

    let text = format!(
        "📊 **Resultado da Análise**\n\
         • Classificação: {label}\n\
         • Confiança: {confidence:.1}%\n\
         • Motivo: {rationale}",
        label = verdict.classification.label(),
        confidence = verdict.confidence * 100.0,
        rationale = truncate_chars(&verdict.rationale, 1000),
    );
    say(ctx, msg, text).await;
}

async fn test_timeout(
    ctx: &Context,
    msg: &Message,
    cfg: &Arc<Config>,
    moderator: &Arc<Moderator>,
    rest: &str,
) {
    let Some(target) = msg.mentions.first() else {
        say(ctx, msg, "Uso: `!testtimeout @membro [minutos]`").await;
        return;
    };

    let minutes = parse_minutes(rest);
    say(
        ctx,
        msg,
        format!(
            "⏳ Testando timeout em {} por {} minuto(s)...",
            target.name, minutes
        ),
    )
    .await;

    let guild = msg.guild_id.map(|g| GuildId(g.get())).unwrap_or(cfg.guild_id);
    let result = moderator
        .mute_with_fallback(
            guild,
            UserId(target.id.get()),
            Duration::from_secs(minutes.saturating_mul(60)),
            "Teste de timeout",
        )
        .await;

    let reply = match result {
        MuteResult::Applied(_) => {
            format!("✅ {} silenciado por {} minuto(s)!", target.name, minutes)
        }
        MuteResult::Failed => format!(
            "❌ Falha ao silenciar {}. Verifique as permissões do bot.",
            target.name
        ),
    };
    say(ctx, msg, reply).await;
}

// Discord caps member timeouts at 28 days.
const MAX_TIMEOUT_MINUTES: u64 = 28 * 24 * 60;

fn parse_minutes(rest: &str) -> u64 {
    rest.split_whitespace()
        .filter_map(|t| t.parse::<u64>().ok())
        .next_back()
        .unwrap_or(1)
        .clamp(1, MAX_TIMEOUT_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_parsing_strips_prefix_and_lowercases() {
        assert_eq!(
            parse_command("!Status"),
            ("status".to_string(), String::new())
        );
        assert_eq!(
            parse_command("!testar O bot parou"),
            ("testar".to_string(), "O bot parou".to_string())
        );
    }

    #[test]
    fn minutes_default_to_one_without_a_number() {
        assert_eq!(parse_minutes("<@123>"), 1);
        assert_eq!(parse_minutes("<@123> 5"), 5);
        assert_eq!(parse_minutes("<@123> 0"), 1);
        assert_eq!(parse_minutes(""), 1);
    }

    #[test]
    fn admin_role_scan_checks_the_administrator_bit() {
        let admin_role = RoleId::new(10);
        let plain_role = RoleId::new(11);
        let perms = |id: &RoleId| {
            if *id == admin_role {
                Some(Permissions::ADMINISTRATOR)
            } else if *id == plain_role {
                Some(Permissions::SEND_MESSAGES)
            } else {
                None
            }
        };

        assert!(any_admin_role(&[plain_role, admin_role], perms));
        assert!(!any_admin_role(&[plain_role], perms));
        assert!(!any_admin_role(&[RoleId::new(99)], perms));
        assert!(!any_admin_role(&[], perms));
    }

    #[test]
    fn minutes_clamp_to_the_timeout_ceiling() {
        assert_eq!(parse_minutes("<@123> 18446744073709551615"), MAX_TIMEOUT_MINUTES);
        assert_eq!(parse_minutes("<@123> 40320"), MAX_TIMEOUT_MINUTES);
        assert_eq!(parse_minutes("<@123> 40319"), 40_319);
    }
}
