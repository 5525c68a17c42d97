//! The orchestrator: received → filtered → classified → acted.
//!
//! The whole sequence runs inside the handling of one gateway event. Nothing
//! here is durable and no state crosses events; every step after
//! classification is independently fault-tolerant (a failed delete never
//! skips the mute, a failed mute never skips the notifications).

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tracing::{info, warn};

use crate::{
    config::Config,
    domain::{FeedbackEvent, GuildId, UserId},
    ports::{ClassifierPort, ClassifyRequest, DeleteOutcome, MuteMechanism, PlatformPort},
    report,
    verdict::{Classification, Verdict},
};

/// Result of a mute attempt after the fallback chain has run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MuteResult {
    Applied(MuteMechanism),
    Failed,
}

/// Per-event summary of what each enforcement action did. Returned to the
/// caller for logging only; nothing is persisted.
#[derive(Clone, Debug)]
pub struct EnforcementOutcome {
    pub verdict: Verdict,
    pub delete: Option<DeleteOutcome>,
    pub mute: Option<MuteResult>,
    pub author_notified: bool,
    pub overseer_notified: bool,
}

/// True when an edited message actually changed versus its prior version and
/// must re-enter the pipeline.
pub fn edit_requires_reprocessing(before: &FeedbackEvent, after: &FeedbackEvent) -> bool {
    if before.text != after.text {
        return true;
    }
    let before_urls: Vec<&str> = before.attachments.iter().map(|a| a.url.as_str()).collect();
    let after_urls: Vec<&str> = after.attachments.iter().map(|a| a.url.as_str()).collect();
    before_urls != after_urls
}

pub struct Moderator {
    cfg: Arc<Config>,
    classifier: Arc<dyn ClassifierPort>,
    platform: Arc<dyn PlatformPort>,
}

impl Moderator {
    pub fn new(
        cfg: Arc<Config>,
        classifier: Arc<dyn ClassifierPort>,
        platform: Arc<dyn PlatformPort>,
    ) -> Self {
        Self {
            cfg,
            classifier,
            platform,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn classifier(&self) -> Arc<dyn ClassifierPort> {
        self.classifier.clone()
    }

    /// Process one feedback event end to end.
    ///
    /// Returns `None` when the event is discarded by the channel/author
    /// filter, otherwise the enforcement summary.
    pub async fn process(&self, event: FeedbackEvent) -> Option<EnforcementOutcome> {
        if event.author.is_bot {
            return None;
        }
        if event.channel_id != self.cfg.feedback_channel_id {
            return None;
        }

        info!(
            author = %event.author.display_name,
            edited = event.is_edit(),
            attachments = event.attachments.len(),
            "processing feedback message"
        );

        let mut image_urls = event.image_urls();
        image_urls.truncate(self.cfg.max_images);

        let verdict = self
            .classifier
            .classify(ClassifyRequest {
                text: event.text.clone(),
                image_urls,
            })
            .await;

        info!(
            classification = verdict.classification.label(),
            confidence = verdict.confidence,
            rationale = %verdict.rationale,
            "verdict received"
        );

        let outcome = match verdict.classification {
            Classification::Positive => self.approve(&event, verdict).await,
            Classification::CustomerRisk => {
                self.enforce(&event, verdict, self.cfg.mute_risk).await
            }
            Classification::Negative => {
                self.enforce(&event, verdict, self.cfg.mute_negative).await
            }
        };

        Some(outcome)
    }

    /// POSITIVO: no deletion, no mute; best-effort thank-you DM.
    async fn approve(&self, event: &FeedbackEvent, verdict: Verdict) -> EnforcementOutcome {
        let thanks = report::thank_you_message(&self.cfg.coupon_code, &self.cfg.store_url);
        let author_notified = match self
            .platform
            .send_direct_message(event.author.id, &thanks)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(user = event.author.id.0, error = %e, "thank-you DM failed");
                false
            }
        };

        EnforcementOutcome {
            verdict,
            delete: None,
            mute: None,
            author_notified,
            overseer_notified: false,
        }
    }

    /// Punitive tiers: delete → mute → notify author → overseer report, in
    /// that order, each step continuing past the previous one's failure.
    async fn enforce(
        &self,
        event: &FeedbackEvent,
        verdict: Verdict,
        mute_duration: Duration,
    ) -> EnforcementOutcome {
        let delete = match self
            .platform
            .delete_message(event.channel_id, event.message_id)
            .await
        {
            Ok(outcome) => {
                match outcome {
                    DeleteOutcome::AlreadyGone => {
                        warn!(message = event.message_id.0, "message was already deleted")
                    }
                    DeleteOutcome::Forbidden => {
                        warn!(message = event.message_id.0, "no permission to delete message")
                    }
                    DeleteOutcome::Deleted => {}
                }
                Some(outcome)
            }
            Err(e) => {
                warn!(message = event.message_id.0, error = %e, "delete failed");
                None
            }
        };

        let reason = mute_reason(verdict.classification);
        let mute = Some(
            self.mute_with_fallback(event.guild_id, event.author.id, mute_duration, reason)
                .await,
        );

        let author_notified = self.notify_author(event, &verdict, mute_duration).await;
        let overseer_notified = self.send_overseer_report(event, &verdict, mute_duration).await;

        EnforcementOutcome {
            verdict,
            delete,
            mute,
            author_notified,
            overseer_notified,
        }
    }

    /// Ordered mute chain: the platform binding's own call first, then one
    /// raw REST attempt with the same target and expiry. No further retry.
    pub async fn mute_with_fallback(
        &self,
        guild: GuildId,
        user: UserId,
        duration: Duration,
        reason: &str,
    ) -> MuteResult {
        let until = Utc::now()
            + chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());

        match self.platform.mute_member(guild, user, until, reason).await {
            Ok(()) => MuteResult::Applied(MuteMechanism::Native),
            Err(e) => {
                warn!(user = user.0, error = %e, "native mute failed, trying REST fallback");
                match self
                    .platform
                    .mute_member_rest(guild, user, until, reason)
                    .await
                {
                    Ok(()) => MuteResult::Applied(MuteMechanism::RestFallback),
                    Err(e) => {
                        warn!(user = user.0, error = %e, "REST mute fallback failed");
                        MuteResult::Failed
                    }
                }
            }
        }
    }

    async fn notify_author(
        &self,
        event: &FeedbackEvent,
        verdict: &Verdict,
        mute_duration: Duration,
    ) -> bool {
        let Some(warning) = report::user_warning(
            verdict.classification,
            mute_duration,
            event.is_edit(),
            &self.cfg.store_name,
            &self.cfg.coupon_code,
        ) else {
            return false;
        };

        match self
            .platform
            .send_direct_message(event.author.id, &warning)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                // Author has DMs closed, most likely. Never blocks the report.
                warn!(user = event.author.id.0, error = %e, "author warning DM failed");
                false
            }
        }
    }

    async fn send_overseer_report(
        &self,
        event: &FeedbackEvent,
        verdict: &Verdict,
        mute_duration: Duration,
    ) -> bool {
        let action = report::action_description(verdict.classification, mute_duration);
        let text = report::overseer_report(
            event,
            verdict,
            &action,
            self.cfg.excerpt_len,
            chrono::Local::now(),
        );

        let sent = match self
            .platform
            .send_direct_message(self.cfg.overseer_id, &text)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "overseer report DM failed");
                false
            }
        };

        for preview in report::attachment_previews(event) {
            if let Err(e) = self
                .platform
                .send_direct_message(self.cfg.overseer_id, &preview)
                .await
            {
                warn!(error = %e, "attachment preview DM failed");
            }
        }

        sent
    }
}

fn mute_reason(classification: Classification) -> &'static str {
    match classification {
        Classification::CustomerRisk => "Feedback pode prejudicar a imagem da loja",
        _ => "Feedback negativo/ofensivo",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Attachment, ChannelId, FeedbackAuthor, GuildId, MessageId, UserId};
    use crate::errors::Error;
    use crate::Result;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    const FEEDBACK_CHANNEL: ChannelId = ChannelId(100);
    const OVERSEER: UserId = UserId(999);
    const AUTHOR: UserId = UserId(42);

    fn test_config() -> Arc<Config> {
        Arc::new(Config {
            discord_token: "token".to_string(),
            openai_api_key: "key".to_string(),
            overseer_id: OVERSEER,
            feedback_channel_id: FEEDBACK_CHANNEL,
            guild_id: GuildId(7),
            openai_model: "gpt-4o".to_string(),
            max_images: 3,
            mute_risk: Duration::from_secs(3_600),
            mute_negative: Duration::from_secs(86_400),
            excerpt_len: 500,
            coupon_code: "E9GSMSBS".to_string(),
            store_name: "BLAZERD STORE".to_string(),
            store_url: "https://blazerdstore.com/".to_string(),
        })
    }

    fn event(text: &str) -> FeedbackEvent {
        FeedbackEvent {
            author: FeedbackAuthor {
                id: AUTHOR,
                display_name: "cliente#1234".to_string(),
                is_bot: false,
            },
            channel_id: FEEDBACK_CHANNEL,
            guild_id: GuildId(7),
            message_id: MessageId(555),
            text: text.to_string(),
            attachments: vec![],
            previous_text: None,
        }
    }

    struct FixedClassifier {
        verdict: Verdict,
        requests: Mutex<Vec<ClassifyRequest>>,
    }

    impl FixedClassifier {
        fn new(classification: Classification) -> Self {
            Self {
                verdict: Verdict {
                    classification,
                    rationale: "motivo de teste".to_string(),
                    confidence: 0.9,
                },
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ClassifierPort for FixedClassifier {
        async fn classify(&self, req: ClassifyRequest) -> Verdict {
            self.requests.lock().unwrap().push(req);
            self.verdict.clone()
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Delete,
        MuteNative { until: DateTime<Utc> },
        MuteRest { until: DateTime<Utc> },
        Dm { user: UserId, text: String },
    }

    #[derive(Default)]
    struct FakePlatform {
        calls: Mutex<Vec<Call>>,
        delete_result: Option<fn() -> Result<DeleteOutcome>>,
        fail_native_mute: bool,
        fail_rest_mute: bool,
        fail_dm_to: Option<UserId>,
    }

    impl FakePlatform {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn dms_to(&self, user: UserId) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::Dm { user: u, text } if u == user => Some(text),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl PlatformPort for FakePlatform {
        async fn delete_message(
            &self,
            _channel: ChannelId,
            _message: MessageId,
        ) -> Result<DeleteOutcome> {
            self.calls.lock().unwrap().push(Call::Delete);
            match self.delete_result {
                Some(f) => f(),
                None => Ok(DeleteOutcome::Deleted),
            }
        }

        async fn mute_member(
            &self,
            _guild: GuildId,
            _user: UserId,
            until: DateTime<Utc>,
            _reason: &str,
        ) -> Result<()> {
            self.calls.lock().unwrap().push(Call::MuteNative { until });
            if self.fail_native_mute {
                return Err(Error::Platform("native mute rejected".to_string()));
            }
            Ok(())
        }

        async fn mute_member_rest(
            &self,
            _guild: GuildId,
            _user: UserId,
            until: DateTime<Utc>,
            _reason: &str,
        ) -> Result<()> {
            self.calls.lock().unwrap().push(Call::MuteRest { until });
            if self.fail_rest_mute {
                return Err(Error::Platform("rest mute rejected".to_string()));
            }
            Ok(())
        }

        async fn send_direct_message(&self, user: UserId, text: &str) -> Result<()> {
            self.calls.lock().unwrap().push(Call::Dm {
                user,
                text: text.to_string(),
            });
            if self.fail_dm_to == Some(user) {
                return Err(Error::Platform("dms closed".to_string()));
            }
            Ok(())
        }
    }

    fn moderator(
        classification: Classification,
        platform: FakePlatform,
    ) -> (Moderator, Arc<FixedClassifier>, Arc<FakePlatform>) {
        let classifier = Arc::new(FixedClassifier::new(classification));
        let platform = Arc::new(platform);
        let m = Moderator::new(test_config(), classifier.clone(), platform.clone());
        (m, classifier, platform)
    }

    fn mute_secs(call: &Call, at: DateTime<Utc>) -> i64 {
        match call {
            Call::MuteNative { until } | Call::MuteRest { until } => {
                until.signed_duration_since(at).num_seconds()
            }
            _ => panic!("not a mute call: {call:?}"),
        }
    }

    #[tokio::test]
    async fn positive_feedback_takes_no_punitive_action() {
        let (m, _, platform) = moderator(Classification::Positive, FakePlatform::default());

        let outcome = m.process(event("Funciona perfeitamente!")).await.unwrap();

        assert_eq!(outcome.delete, None);
        assert_eq!(outcome.mute, None);
        assert!(outcome.author_notified);
        assert!(!outcome.overseer_notified);

        let calls = platform.calls();
        assert_eq!(calls.len(), 1);
        let thanks = &platform.dms_to(AUTHOR)[0];
        assert!(thanks.contains("E9GSMSBS"));
        assert!(thanks.contains("Obrigado"));
    }

    #[tokio::test]
    async fn risk_runs_full_sequence_in_order_with_one_hour_mute() {
        let before = Utc::now();
        let (m, _, platform) =
            moderator(Classification::CustomerRisk, FakePlatform::default());

        let outcome = m
            .process(event("O bot parou de funcionar pra mim."))
            .await
            .unwrap();

        assert_eq!(outcome.delete, Some(DeleteOutcome::Deleted));
        assert_eq!(outcome.mute, Some(MuteResult::Applied(MuteMechanism::Native)));
        assert!(outcome.author_notified);
        assert!(outcome.overseer_notified);

        let calls = platform.calls();
        assert_eq!(calls[0], Call::Delete);
        assert!(matches!(calls[1], Call::MuteNative { .. }));
        assert!(matches!(calls[2], Call::Dm { user, .. } if user == AUTHOR));
        assert!(matches!(calls[3], Call::Dm { user, .. } if user == OVERSEER));

        let secs = mute_secs(&calls[1], before);
        assert!((3_595..=3_605).contains(&secs), "mute was {secs}s, wanted ~1h");

        // RISK tier carries the incentive coupon in the author warning.
        assert!(platform.dms_to(AUTHOR)[0].contains("E9GSMSBS"));
    }

    #[tokio::test]
    async fn negative_mutes_for_one_day_and_warns_about_ban() {
        let before = Utc::now();
        let (m, _, platform) = moderator(Classification::Negative, FakePlatform::default());

        let outcome = m.process(event("Esse servidor é uma fraude.")).await.unwrap();

        assert_eq!(outcome.mute, Some(MuteResult::Applied(MuteMechanism::Native)));
        let calls = platform.calls();
        let secs = mute_secs(&calls[1], before);
        assert!((86_395..=86_405).contains(&secs), "mute was {secs}s, wanted ~24h");

        let warning = &platform.dms_to(AUTHOR)[0];
        assert!(warning.contains("1 DIA (24 horas)"));
        assert!(warning.contains("BANIDO PERMANENTEMENTE"));

        let report = &platform.dms_to(OVERSEER)[0];
        assert!(report.contains("🔴"));
        assert!(report.contains("NEGATIVO"));
    }

    #[tokio::test]
    async fn already_deleted_message_is_a_non_fatal_outcome() {
        let platform = FakePlatform {
            delete_result: Some(|| Ok(DeleteOutcome::AlreadyGone)),
            ..FakePlatform::default()
        };
        let (m, _, platform) = moderator(Classification::Negative, platform);

        let outcome = m.process(event("Roubaram meu dinheiro.")).await.unwrap();

        assert_eq!(outcome.delete, Some(DeleteOutcome::AlreadyGone));
        // Remaining actions still ran.
        assert_eq!(outcome.mute, Some(MuteResult::Applied(MuteMechanism::Native)));
        assert!(platform.calls().iter().any(|c| matches!(c, Call::MuteNative { .. })));
    }

    #[tokio::test]
    async fn delete_error_does_not_skip_mute_or_notifications() {
        let platform = FakePlatform {
            delete_result: Some(|| Err(Error::Platform("boom".to_string()))),
            ..FakePlatform::default()
        };
        let (m, _, platform) = moderator(Classification::Negative, platform);

        let outcome = m.process(event("Não comprem, é scam.")).await.unwrap();

        assert_eq!(outcome.delete, None);
        assert_eq!(outcome.mute, Some(MuteResult::Applied(MuteMechanism::Native)));
        assert!(outcome.author_notified);
        assert!(outcome.overseer_notified);
        assert_eq!(platform.dms_to(OVERSEER).len(), 1);
    }

    #[tokio::test]
    async fn mute_falls_back_to_rest_with_the_same_expiry() {
        let platform = FakePlatform {
            fail_native_mute: true,
            ..FakePlatform::default()
        };
        let (m, _, platform) = moderator(Classification::Negative, platform);

        let outcome = m.process(event("Suporte horrível, não funciona nada.")).await.unwrap();

        assert_eq!(
            outcome.mute,
            Some(MuteResult::Applied(MuteMechanism::RestFallback))
        );

        let calls = platform.calls();
        let native_until = calls
            .iter()
            .find_map(|c| match c {
                Call::MuteNative { until } => Some(*until),
                _ => None,
            })
            .unwrap();
        let rest_until = calls
            .iter()
            .find_map(|c| match c {
                Call::MuteRest { until } => Some(*until),
                _ => None,
            })
            .unwrap();
        assert_eq!(native_until, rest_until);
    }

    #[tokio::test]
    async fn mute_reported_failed_after_both_mechanisms_fail() {
        let platform = FakePlatform {
            fail_native_mute: true,
            fail_rest_mute: true,
            ..FakePlatform::default()
        };
        let (m, _, platform) = moderator(Classification::Negative, platform);

        let outcome = m.process(event("É scam.")).await.unwrap();

        assert_eq!(outcome.mute, Some(MuteResult::Failed));
        // Still notified both parties.
        assert!(outcome.author_notified);
        assert!(outcome.overseer_notified);
        assert_eq!(platform.dms_to(AUTHOR).len(), 1);
    }

    #[tokio::test]
    async fn closed_author_dms_do_not_block_the_overseer_report() {
        let platform = FakePlatform {
            fail_dm_to: Some(AUTHOR),
            ..FakePlatform::default()
        };
        let (m, _, platform) = moderator(Classification::Negative, platform);

        let outcome = m.process(event("Fraude.")).await.unwrap();

        assert!(!outcome.author_notified);
        assert!(outcome.overseer_notified);
        assert_eq!(platform.dms_to(OVERSEER).len(), 1);
    }

    #[tokio::test]
    async fn bot_authors_and_foreign_channels_are_discarded() {
        let (m, classifier, platform) =
            moderator(Classification::Negative, FakePlatform::default());

        let mut from_bot = event("scam");
        from_bot.author.is_bot = true;
        assert!(m.process(from_bot).await.is_none());

        let mut elsewhere = event("scam");
        elsewhere.channel_id = ChannelId(12345);
        assert!(m.process(elsewhere).await.is_none());

        assert_eq!(classifier.request_count(), 0);
        assert!(platform.calls().is_empty());
    }

    #[tokio::test]
    async fn command_prefixed_text_is_still_classified_and_enforced() {
        let (m, classifier, platform) =
            moderator(Classification::Negative, FakePlatform::default());

        let outcome = m
            .process(event("!testar Esse servidor é uma fraude"))
            .await
            .unwrap();

        assert_eq!(classifier.request_count(), 1);
        assert_eq!(outcome.delete, Some(DeleteOutcome::Deleted));
        assert!(platform
            .calls()
            .iter()
            .any(|c| matches!(c, Call::MuteNative { .. })));
    }

    #[tokio::test]
    async fn classifier_sees_at_most_three_image_urls() {
        let (m, classifier, _) = moderator(Classification::Positive, FakePlatform::default());

        let mut e = event("");
        e.attachments = (0..5)
            .map(|i| Attachment {
                url: format!("https://cdn.example/{i}.png"),
                filename: format!("{i}.png"),
            })
            .collect();
        m.process(e).await.unwrap();

        let reqs = classifier.requests.lock().unwrap();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].image_urls.len(), 3);
        assert_eq!(reqs[0].image_urls[0], "https://cdn.example/0.png");
    }

    #[tokio::test]
    async fn edited_message_report_carries_both_texts() {
        let (m, _, platform) = moderator(Classification::Negative, FakePlatform::default());

        let mut e = event("agora com roubo no texto");
        e.previous_text = Some("mensagem neutra".to_string());
        let outcome = m.process(e).await.unwrap();
        assert!(outcome.overseer_notified);

        let report = &platform.dms_to(OVERSEER)[0];
        assert!(report.contains("Mensagem EDITADA"));
        assert!(report.contains("**Mensagem Original:** mensagem neutra"));
        assert!(report.contains("**Mensagem Editada:** agora com roubo no texto"));

        // Edit flag is surfaced to the author as well.
        assert!(platform.dms_to(AUTHOR)[0].contains("(mensagem editada)"));
    }

    #[tokio::test]
    async fn overseer_gets_attachment_previews_after_the_report() {
        let (m, _, platform) = moderator(Classification::CustomerRisk, FakePlatform::default());

        let mut e = event("Demorou muito pra receber o produto.");
        e.attachments = vec![
            Attachment {
                url: "https://cdn.example/a.png".to_string(),
                filename: "a.png".to_string(),
            },
            Attachment {
                url: "https://cdn.example/b.png".to_string(),
                filename: "b.png".to_string(),
            },
        ];
        m.process(e).await.unwrap();

        let overseer_dms = platform.dms_to(OVERSEER);
        assert_eq!(overseer_dms.len(), 3);
        assert!(overseer_dms[0].contains("RELATÓRIO"));
        assert_eq!(overseer_dms[1], "**Anexo 1:** https://cdn.example/a.png");
        assert_eq!(overseer_dms[2], "**Anexo 2:** https://cdn.example/b.png");
    }

    #[test]
    fn edit_reprocessing_requires_a_real_change() {
        let a = event("texto");
        let mut b = event("texto");
        assert!(!edit_requires_reprocessing(&a, &b));

        b.text = "texto com roubo".to_string();
        assert!(edit_requires_reprocessing(&a, &b));

        let mut c = event("texto");
        c.attachments.push(Attachment {
            url: "https://cdn.example/x.png".to_string(),
            filename: "x.png".to_string(),
        });
        assert!(edit_requires_reprocessing(&a, &c));
    }
}
