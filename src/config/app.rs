//! Application configuration loaded from `config.toml`.
//!
//! Every section has defaults so the bot starts without a config file. Secrets
//! (Discord token, LLM keys) never live here; they are read from the
//! environment by [`crate::config::secrets`].

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Environment variable overriding [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_PATH_VAR: &str = "FROSTKEEPER_CONFIG";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Discord-facing behavior
    pub bot: BotConfig,
    /// Game API endpoints
    pub wos: WosConfig,
    /// Gift code redemption pacing
    pub redemption: RedemptionConfig,
    /// CAPTCHA OCR endpoint
    pub captcha: CaptchaConfig,
    /// Alliance change monitor
    pub monitor: MonitorConfig,
    /// Language model key pool
    pub llm: LlmConfig,
    /// Player lookup
    pub player: PlayerConfig,
    /// Health endpoint
    pub health: HealthConfig,
}

/// `[bot]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Guild to register commands in for instant availability during development
    pub dev_guild_id: Option<u64>,
    /// Grant global admin to Discord server administrators that are not yet admins
    pub trust_guild_administrators: bool,
    /// Footer shown on embeds
    pub footer_text: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            dev_guild_id: None,
            trust_guild_administrators: true,
            footer_text: "Frostkeeper".to_string(),
        }
    }
}

/// `[wos]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WosConfig {
    /// Base URL of the gift code API
    pub api_base: String,
    /// Shared secret appended before signing
    pub secret: String,
    /// Per-request timeout
    pub request_timeout_secs: u64,
}

impl Default for WosConfig {
    fn default() -> Self {
        Self {
            api_base: "https://wos-giftcode-api.centurygame.com".to_string(),
            secret: "tB87#kPtkxqOS2".to_string(),
            request_timeout_secs: 20,
        }
    }
}

impl WosConfig {
    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// `[redemption]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedemptionConfig {
    /// Retries for a single HTTP call
    pub max_retries: u32,
    /// CAPTCHA rounds per player before giving up
    pub captcha_attempts: u32,
    /// Base of the exponential transport backoff
    pub base_backoff_ms: u64,
    /// Minimum wait after a 429 or Cloudflare block
    pub cloudflare_backoff_secs: u64,
    /// Wait per attempt after a 5xx
    pub server_error_backoff_secs: u64,
    /// Pause between two members of the same job
    pub member_delay_ms: u64,
}

impl Default for RedemptionConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            captcha_attempts: 4,
            base_backoff_ms: 1_000,
            cloudflare_backoff_secs: 60,
            server_error_backoff_secs: 5,
            member_delay_ms: 1_500,
        }
    }
}

/// `[captcha]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptchaConfig {
    /// OCR endpoint receiving `{"image": "<base64>"}`
    pub solver_url: String,
    /// Solutions below this confidence are discarded
    pub min_confidence: f32,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            solver_url: "http://127.0.0.1:8765/solve".to_string(),
            min_confidence: 0.4,
        }
    }
}

/// `[monitor]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// How often the monitor wakes up
    pub interval_secs: u64,
    /// Pause between two member lookups
    pub member_delay_ms: u64,
    /// Pause between two alliances
    pub alliance_delay_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            member_delay_ms: 1_000,
            alliance_delay_secs: 5,
        }
    }
}

/// `[llm]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Chat completions endpoint
    pub endpoint: String,
    /// Model identifier
    pub model: String,
    /// Rounds over the key pool
    pub max_retries: u32,
    /// Base of the exponential backoff between rounds
    pub base_backoff_ms: u64,
    /// Consecutive failures that open a key's circuit
    pub failure_threshold: u32,
    /// How long an open circuit stays open
    pub circuit_open_secs: u64,
    /// How long a rate-limited key rests
    pub rate_limit_secs: u64,
    /// Completion size limit
    pub max_tokens: u32,
    /// System prompt for `/ask`
    pub system_prompt: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            model: "openai/gpt-3.5-turbo".to_string(),
            max_retries: 3,
            base_backoff_ms: 1_000,
            failure_threshold: 3,
            circuit_open_secs: 300,
            rate_limit_secs: 60,
            max_tokens: 1_000,
            system_prompt: "You are a helpful assistant for a Whiteout Survival alliance.".to_string(),
        }
    }
}

/// `[player]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Lifetime of a cached player lookup
    pub cache_ttl_secs: u64,
    /// Maximum ids per `/playerinfo`
    pub max_batch: usize,
    /// Parallel lookups
    pub concurrency: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 60,
            max_batch: 30,
            concurrency: 10,
        }
    }
}

/// `[health]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Serve `/` and `/health`
    pub enabled: bool,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Loading configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    parse_config(&contents)
}

/// Parses configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads the configuration from `$FROSTKEEPER_CONFIG` or `./config.toml`.
///
/// A missing file is not an error: defaults are used and a warning is logged.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if Path::new(&path).exists() {
        load_config(&path)
    } else {
        warn!("No configuration file at {path}, using defaults.");
        Ok(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.redemption.captcha_attempts, 4);
        assert_eq!(config.player.max_batch, 30);
        assert_eq!(config.llm.failure_threshold, 3);
        assert!(config.bot.trust_guild_administrators);
        assert!(config.health.enabled);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let toml_str = r#"
            [bot]
            dev_guild_id = 850787279664185434
            footer_text = "ICE"

            [redemption]
            member_delay_ms = 250

            [monitor]
            interval_secs = 60
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.bot.dev_guild_id, Some(850_787_279_664_185_434));
        assert_eq!(config.bot.footer_text, "ICE");
        assert!(config.bot.trust_guild_administrators);
        assert_eq!(config.redemption.member_delay_ms, 250);
        assert_eq!(config.redemption.max_retries, 3);
        assert_eq!(config.monitor.interval_secs, 60);
        assert_eq!(config.monitor.alliance_delay_secs, 5);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = parse_config("[bot\nfooter_text = 1");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = load_config("definitely/not/here.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
