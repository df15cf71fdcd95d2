//! Values read from the environment (`.env` is loaded by `main`).
//!
//! Secrets never appear in `config.toml`; everything here is looked up from
//! environment variables at startup.

use crate::errors::{Error, Result};
use tracing::warn;

/// Prefix of the numbered LLM key variables.
const LLM_KEY_PREFIX: &str = "OPENROUTER_API_KEY_";

/// Highest numbered LLM key that is looked up.
const MAX_LLM_KEYS: usize = 9;

/// Default port of the health endpoint.
pub const DEFAULT_HEALTH_PORT: u16 = 8080;

/// Reads the Discord bot token.
pub fn discord_token() -> Result<String> {
    std::env::var("DISCORD_BOT_TOKEN").map_err(Error::EnvVar)
}

/// Collects `OPENROUTER_API_KEY_1..9`, stopping at the first missing index.
#[must_use]
pub fn llm_api_keys() -> Vec<String> {
    collect_numbered(|name| std::env::var(name).ok())
}

fn collect_numbered(lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
    (1..=MAX_LLM_KEYS)
        .map(|i| lookup(&format!("{LLM_KEY_PREFIX}{i}")))
        .take_while(Option::is_some)
        .flatten()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .collect()
}

/// Discord user ids from `INITIAL_ADMIN_IDS` that are seeded as global admins.
#[must_use]
pub fn initial_admin_ids() -> Vec<String> {
    std::env::var("INITIAL_ADMIN_IDS")
        .map(|raw| parse_id_list(&raw))
        .unwrap_or_default()
}

/// Splits a comma-separated list of Discord ids, dropping anything non-numeric.
#[must_use]
pub fn parse_id_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .filter(|id| {
            let numeric = id.chars().all(|c| c.is_ascii_digit());
            if !numeric {
                warn!("Ignoring malformed admin id '{id}'");
            }
            numeric
        })
        .map(str::to_string)
        .collect()
}

/// Port for the health endpoint from `PORT`.
#[must_use]
pub fn health_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_HEALTH_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_collect_numbered_stops_at_gap() {
        let vars: HashMap<&str, &str> = [
            ("OPENROUTER_API_KEY_1", "k1"),
            ("OPENROUTER_API_KEY_2", " k2 "),
            ("OPENROUTER_API_KEY_4", "k4"),
        ]
        .into_iter()
        .collect();

        let keys = collect_numbered(|name| vars.get(name).map(|v| (*v).to_string()));
        assert_eq!(keys, vec!["k1".to_string(), "k2".to_string()]);
    }

    #[test]
    fn test_collect_numbered_empty() {
        assert!(collect_numbered(|_| None).is_empty());
    }

    #[test]
    fn test_parse_id_list() {
        let ids = parse_id_list(" 123456789012345678, ,abc, 42");
        assert_eq!(ids, vec!["123456789012345678".to_string(), "42".to_string()]);
    }
}
