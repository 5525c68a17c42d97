//! Report Composer: all user-facing moderation texts.
//!
//! Everything here is a pure function over the captured event + verdict so it
//! can be tested without any platform in the loop. Delivery (and delivery
//! failure handling) is the orchestrator's job.

use std::time::Duration;

use chrono::{DateTime, Local};

use crate::{
    domain::FeedbackEvent,
    verdict::{Classification, Verdict},
};

/// Char-safe excerpt used everywhere a message body is quoted.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}

/// Human form of a mute duration, matching the policy wording:
/// 24h → "1 DIA (24 horas)", 1h → "1 HORA", sub-hour → minutes.
pub fn format_mute_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 86_400 && secs % 86_400 == 0 {
        let days = secs / 86_400;
        if days == 1 {
            return format!("1 DIA ({} horas)", secs / 3_600);
        }
        return format!("{days} DIAS ({} horas)", secs / 3_600);
    }
    if secs >= 3_600 && secs % 3_600 == 0 {
        let hours = secs / 3_600;
        if hours == 1 {
            return "1 HORA".to_string();
        }
        return format!("{hours} HORAS");
    }
    format!("{} minuto(s)", secs.div_ceil(60))
}

/// Warning DM sent to the author of a removed message. `None` for POSITIVO:
/// approved feedback gets [`thank_you_message`] instead.
pub fn user_warning(
    classification: Classification,
    mute_duration: Duration,
    is_edit: bool,
    store_name: &str,
    coupon_code: &str,
) -> Option<String> {
    let edit_text = if is_edit { " (mensagem editada)" } else { "" };
    let duration = format_mute_duration(mute_duration);

    match classification {
        Classification::Negative => Some(format!(
            "⚠️ **AVISO - {store_name}**{edit_text}\n\
             \n\
             Sua mensagem no canal de feedback foi removida por violar as regras do servidor.\n\
             \n\
             📋 **Regra violada:** Feedback ofensivo/prejudicial à loja\n\
             ⏰ **Consequência:** Você foi silenciado por **{duration}**\n\
             \n\
             🚨 **ATENÇÃO:** Se continuar quebrando as regras, você será **BANIDO PERMANENTEMENTE** do servidor.\n\
             \n\
             Se acredita que isso foi um erro, entre em contato com o suporte após o período de silenciamento."
        )),
        Classification::CustomerRisk => Some(format!(
            "⚠️ **AVISO - {store_name}**{edit_text}\n\
             \n\
             Sua mensagem no canal de feedback foi removida.\n\
             \n\
             📋 **Motivo:** O conteúdo pode prejudicar a imagem da loja\n\
             ⏰ **Consequência:** Você foi silenciado por **{duration}**\n\
             \n\
             🚨 **ATENÇÃO:** Se continuar quebrando as regras, você será **BANIDO PERMANENTEMENTE** do servidor.\n\
             \n\
             💡 Se tiver problemas com o produto, entre em contato com o suporte diretamente.\n\
             \n\
             🎁 Cupom de 5% off após enviar feedback positivo: **{coupon_code}**"
        )),
        Classification::Positive => None,
    }
}

/// Thank-you DM for approved feedback.
pub fn thank_you_message(coupon_code: &str, store_url: &str) -> String {
    format!(
        "🎉 **Obrigado pelo seu feedback positivo!**\n\
         \n\
         🎁 Cupom de 5% off: **{coupon_code}**\n\
         🔗 {store_url}"
    )
}

/// One-line description of the enforcement taken, for the overseer report.
pub fn action_description(classification: Classification, mute_duration: Duration) -> String {
    match classification {
        Classification::Positive => "Nenhuma ação (feedback aprovado)".to_string(),
        Classification::CustomerRisk | Classification::Negative => format!(
            "Mensagem excluída + Silenciado por {}",
            format_mute_duration(mute_duration)
        ),
    }
}

/// The full moderation report DM'd to the overseer.
pub fn overseer_report(
    event: &FeedbackEvent,
    verdict: &Verdict,
    action_taken: &str,
    excerpt_len: usize,
    now: DateTime<Local>,
) -> String {
    let divider = "━".repeat(40);
    let author = &event.author;
    let mention = format!("<@{}>", author.id.0);

    let type_line = if event.is_edit() {
        "📝 **Tipo:** Mensagem EDITADA"
    } else {
        "📝 **Tipo:** Mensagem Nova"
    };

    let content_block = match &event.previous_text {
        Some(original) => format!(
            "📝 **Mensagem Original:** {}\n📝 **Mensagem Editada:** {}",
            truncate_chars(original, excerpt_len),
            truncate_chars(&event.text, excerpt_len)
        ),
        None => {
            let body = if event.text.is_empty() {
                "(Sem texto)".to_string()
            } else {
                truncate_chars(&event.text, excerpt_len)
            };
            format!("💬 **Conteúdo:** {body}")
        }
    };

    let attachment_lines = if event.attachments.is_empty() {
        String::new()
    } else {
        let urls = event
            .attachments
            .iter()
            .take(3)
            .map(|a| format!("• {}", a.url))
            .collect::<Vec<_>>()
            .join("\n");
        format!("🖼️ **URLs das imagens:**\n{urls}")
    };

    format!(
        "📊 **RELATÓRIO DE FEEDBACK MODERADO**\n\
         {divider}\n\
         \n\
         {glyph} **Classificação:** {label}\n\
         📈 **Confiança da IA:** {confidence:.1}%\n\
         \n\
         👤 **Usuário:** {mention} ({display})\n\
         🆔 **ID do Usuário:** {user_id}\n\
         \n\
         {type_line}\n\
         {content_block}\n\
         \n\
         📎 **Anexos:** {attachment_count} arquivo(s)\n\
         {attachment_lines}\n\
         \n\
         🤖 **Motivo da IA:** {rationale}\n\
         \n\
         ⚡ **Ação Tomada:** {action_taken}\n\
         \n\
         🕐 **Data/Hora:** {timestamp}\n\
         {divider}",
        glyph = verdict.classification.glyph(),
        label = verdict.classification.label(),
        confidence = verdict.confidence * 100.0,
        display = author.display_name,
        user_id = author.id.0,
        attachment_count = event.attachments.len(),
        rationale = verdict.rationale,
        timestamp = now.format("%d/%m/%Y %H:%M:%S"),
    )
}

/// Follow-up DMs so the overseer can preview attachments (first 3).
pub fn attachment_previews(event: &FeedbackEvent) -> Vec<String> {
    event
        .attachments
        .iter()
        .take(3)
        .enumerate()
        .map(|(i, a)| format!("**Anexo {}:** {}", i + 1, a.url))
        .collect()
}
