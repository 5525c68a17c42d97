use std::{env, fs, path::Path, time::Duration};

use crate::{
    domain::{ChannelId, GuildId, UserId},
    errors::Error,
    Result,
};

/// Typed configuration for the bot, built once at startup and shared via `Arc`.
#[derive(Clone, Debug)]
pub struct Config {
    // Credentials
    pub discord_token: String,
    pub openai_api_key: String,

    // Identities
    pub overseer_id: UserId,
    pub feedback_channel_id: ChannelId,
    pub guild_id: GuildId,

    // Classifier
    pub openai_model: String,
    pub max_images: usize,

    // Enforcement policy
    pub mute_risk: Duration,
    pub mute_negative: Duration,

    // Report / notification texts
    pub excerpt_len: usize,
    pub coupon_code: String,
    pub store_name: String,
    pub store_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        // Required env vars: missing credentials are fatal before any event
        // is accepted.
        let discord_token = env_str("DISCORD_TOKEN").and_then(non_empty).ok_or_else(|| {
            Error::Config("DISCORD_TOKEN environment variable is required".to_string())
        })?;
        let openai_api_key = env_str("OPENAI_API_KEY").and_then(non_empty).ok_or_else(|| {
            Error::Config("OPENAI_API_KEY environment variable is required".to_string())
        })?;

        let overseer_id = UserId(env_u64("LEADER_ID").unwrap_or(0));
        let feedback_channel_id = ChannelId(env_u64("FEEDBACK_CHANNEL_ID").unwrap_or(0));
        let guild_id = GuildId(env_u64("GUILD_ID").unwrap_or(0));

        let openai_model = env_str("OPENAI_MODEL")
            .and_then(non_empty)
            .unwrap_or_else(|| "gpt-4o".to_string());
        let max_images = env_usize("MAX_IMAGES").unwrap_or(3);

        // Mute durations are policy constants: 1 hour for reputation-risk
        // feedback, 24 hours for hostile feedback.
        let mute_risk = Duration::from_secs(env_u64("MUTE_RISK_SECS").unwrap_or(3_600));
        let mute_negative = Duration::from_secs(env_u64("MUTE_NEGATIVE_SECS").unwrap_or(86_400));

        let excerpt_len = env_usize("REPORT_EXCERPT_LEN").unwrap_or(500);
        let coupon_code = env_str("COUPON_CODE")
            .and_then(non_empty)
            .unwrap_or_else(|| "E9GSMSBS".to_string());
        let store_name = env_str("STORE_NAME")
            .and_then(non_empty)
            .unwrap_or_else(|| "BLAZERD STORE".to_string());
        let store_url = env_str("STORE_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| "https://blazerdstore.com/".to_string());

        Ok(Self {
            discord_token,
            openai_api_key,
            overseer_id,
            feedback_channel_id,
            guild_id,
            openai_model,
            max_images,
            mute_risk,
            mute_negative,
            excerpt_len,
            coupon_code,
            store_name,
            store_url,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotenv_does_not_override_existing_env() {
        let dir = std::path::PathBuf::from(format!("/tmp/fmb-env-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let file = dir.join(".env");
        fs::write(&file, "FMB_TEST_KEY=\"from-file\"\n# comment\nFMB_TEST_NEW='fresh'\n")
            .unwrap();

        env::set_var("FMB_TEST_KEY", "from-env");
        env::remove_var("FMB_TEST_NEW");

        load_dotenv_if_present(&file);

        assert_eq!(env::var("FMB_TEST_KEY").unwrap(), "from-env");
        assert_eq!(env::var("FMB_TEST_NEW").unwrap(), "fresh");

        env::remove_var("FMB_TEST_KEY");
        env::remove_var("FMB_TEST_NEW");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn non_empty_rejects_whitespace() {
        assert_eq!(non_empty("  ".to_string()), None);
        assert_eq!(non_empty("x".to_string()), Some("x".to_string()));
    }
}
