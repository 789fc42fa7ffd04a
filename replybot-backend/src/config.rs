use crate::channels::oauth::TwitterCredentials;
use std::env;

/// Environment variable names - single source of truth
pub mod env_vars {
    // Twitter OAuth 1.0a user context
    pub const TWITTER_API_KEY: &str = "TWITTER_API_KEY";
    pub const TWITTER_API_SECRET: &str = "TWITTER_API_SECRET";
    pub const TWITTER_ACCESS_TOKEN: &str = "TWITTER_ACCESS_TOKEN";
    pub const TWITTER_ACCESS_TOKEN_SECRET: &str = "TWITTER_ACCESS_TOKEN_SECRET";
    // Accepted for compatibility; every call is signed with the user context instead
    pub const TWITTER_BEARER_TOKEN: &str = "TWITTER_BEARER_TOKEN";
    // Language model
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const OPENAI_MODEL: &str = "OPENAI_MODEL";
    pub const OPENAI_ENDPOINT: &str = "OPENAI_ENDPOINT";
    pub const OPENAI_TEMPERATURE: &str = "OPENAI_TEMPERATURE";
    pub const OPENAI_MAX_TOKENS: &str = "OPENAI_MAX_TOKENS";
    // Bot behaviour
    pub const RESPONSE_LIMIT: &str = "REPLYBOT_RESPONSE_LIMIT";
    pub const LOOKBACK_MINUTES: &str = "REPLYBOT_LOOKBACK_MINUTES";
    pub const POLL_INTERVAL_SECS: &str = "REPLYBOT_POLL_INTERVAL_SECS";
    pub const SYSTEM_PROMPT: &str = "REPLYBOT_SYSTEM_PROMPT";
}

/// Default values
pub mod defaults {
    pub const OPENAI_MODEL: &str = "gpt-4";
    pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
    pub const OPENAI_TEMPERATURE: f32 = 0.5;
    pub const OPENAI_MAX_TOKENS: u32 = 256;
    pub const RESPONSE_LIMIT: usize = 35;
    pub const LOOKBACK_MINUTES: i64 = 20;
    pub const POLL_INTERVAL_SECS: u64 = 360;
}

/// Minimum poll interval in seconds (Twitter rate limit protection)
const MIN_POLL_INTERVAL_SECS: u64 = 60;

/// Longest lookback window accepted, in minutes (one week)
const MAX_LOOKBACK_MINUTES: i64 = 7 * 24 * 60;

/// Settings consumed by the mention pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponderSettings {
    /// Maximum mentions processed per run
    pub response_limit: usize,
    pub lookback_minutes: i64,
}

impl Default for ResponderSettings {
    fn default() -> Self {
        ResponderSettings {
            response_limit: defaults::RESPONSE_LIMIT,
            lookback_minutes: defaults::LOOKBACK_MINUTES,
        }
    }
}

/// Language model settings
#[derive(Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
}

impl std::fmt::Debug for OpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("custom_system_prompt", &self.system_prompt.is_some())
            .finish()
    }
}

#[derive(Clone)]
pub struct Config {
    pub credentials: TwitterCredentials,
    pub openai: OpenAIConfig,
    pub responder: ResponderSettings,
    pub poll_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| format!("{} not configured", key))
        };

        let credentials = TwitterCredentials::new(
            required(env_vars::TWITTER_API_KEY)?,
            required(env_vars::TWITTER_API_SECRET)?,
            required(env_vars::TWITTER_ACCESS_TOKEN)?,
            required(env_vars::TWITTER_ACCESS_TOKEN_SECRET)?,
        );

        if lookup(env_vars::TWITTER_BEARER_TOKEN).is_some() {
            log::debug!("TWITTER_BEARER_TOKEN is set but unused; requests are signed with OAuth 1.0a");
        }

        let openai = OpenAIConfig {
            api_key: required(env_vars::OPENAI_API_KEY)?,
            model: lookup(env_vars::OPENAI_MODEL)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| defaults::OPENAI_MODEL.to_string()),
            endpoint: lookup(env_vars::OPENAI_ENDPOINT)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| defaults::OPENAI_ENDPOINT.to_string()),
            temperature: parse_or_default(
                &lookup,
                env_vars::OPENAI_TEMPERATURE,
                defaults::OPENAI_TEMPERATURE,
            )
            .clamp(0.0, 2.0),
            max_tokens: parse_or_default(&lookup, env_vars::OPENAI_MAX_TOKENS, defaults::OPENAI_MAX_TOKENS),
            system_prompt: lookup(env_vars::SYSTEM_PROMPT).filter(|v| !v.trim().is_empty()),
        };

        let responder = ResponderSettings {
            response_limit: parse_or_default(&lookup, env_vars::RESPONSE_LIMIT, defaults::RESPONSE_LIMIT),
            lookback_minutes: bounded_lookback(parse_or_default(
                &lookup,
                env_vars::LOOKBACK_MINUTES,
                defaults::LOOKBACK_MINUTES,
            )),
        };

        let poll_interval_secs =
            parse_or_default(&lookup, env_vars::POLL_INTERVAL_SECS, defaults::POLL_INTERVAL_SECS)
                .max(MIN_POLL_INTERVAL_SECS);

        Ok(Self {
            credentials,
            openai,
            responder,
            poll_interval_secs,
        })
    }
}

fn bounded_lookback(minutes: i64) -> i64 {
    let bounded = minutes.clamp(1, MAX_LOOKBACK_MINUTES);
    if bounded != minutes {
        log::warn!(
            "{}={} is out of range, using {} minutes",
            env_vars::LOOKBACK_MINUTES,
            minutes,
            bounded
        );
    }
    bounded
}

/// Parse an optional value, warning and falling back to the default when malformed
fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Invalid value for {}: {:?}, using default {}", key, raw, default);
            default
        }),
        _ => default,
    }
}
