use std::sync::Arc;

use serenity::http::Http;

use fmb_core::{config::Config, moderation::Moderator};
use fmb_discord::DiscordPlatform;
use fmb_openai::OpenAiClassifier;

#[tokio::main]
async fn main() -> Result<(), fmb_core::Error> {
    fmb_core::logging::init("fmb")?;

    // Missing credentials are fatal here, before any event is accepted.
    let cfg = Arc::new(Config::load()?);

    let classifier = Arc::new(OpenAiClassifier::new(
        cfg.openai_api_key.clone(),
        cfg.openai_model.clone(),
    ));

    let http = Arc::new(Http::new(&cfg.discord_token));
    let platform = Arc::new(DiscordPlatform::new(http, cfg.discord_token.clone()));

    let moderator = Arc::new(Moderator::new(cfg.clone(), classifier, platform));

    fmb_discord::gateway::run(cfg, moderator)
        .await
        .map_err(|e| fmb_core::Error::Platform(format!("gateway failed: {e}")))?;

    Ok(())
}
