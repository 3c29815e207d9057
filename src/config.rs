//! Runtime configuration, read from the environment (and `.env` through `dotenv`).

use rand::seq::IndexedRandom;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Token of the primary bot, the one running the command framework.
    pub discord_token: String,
    /// Tokens of the extra pool bots.
    pub pool_tokens: Vec<String>,
    pub prefix: String,
    pub lavalink_url: String,
    pub lavalink_password: String,
    pub database_path: PathBuf,
    pub saved_queue_dir: PathBuf,
    pub queue_max_entries: usize,
    pub extra_hints: Vec<String>,
    pub error_report_webhook: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        let discord_token = var("DISCORD_TOKEN").ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        let queue_max_entries = match var("QUEUE_MAX_ENTRIES") {
            Some(value) => value
                .parse::<usize>()
                .ok()
                .filter(|max| *max > 0)
                .ok_or(ConfigError::Invalid {
                    name: "QUEUE_MAX_ENTRIES",
                    value,
                })?,
            None => 1000,
        };

        Ok(Self {
            discord_token,
            pool_tokens: split_list(&or("POOL_TOKENS", ""), ","),
            prefix: or("DEFAULT_PREFIX", "!"),
            lavalink_url: or("LAVALINK_URL", "http://127.0.0.1:2333"),
            lavalink_password: or("LAVALINK_PASSWORD", "youshallnotpass"),
            database_path: or("DATABASE_PATH", "application_data.db").into(),
            saved_queue_dir: or("SAVED_QUEUE_DIR", "./saved_queues").into(),
            queue_max_entries,
            extra_hints: split_list(&or("EXTRA_HINTS", ""), "||"),
            error_report_webhook: var("AUTO_ERROR_REPORT_WEBHOOK"),
        })
    }

    /// Every bot token, primary first.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.discord_token.as_str()).chain(self.pool_tokens.iter().map(String::as_str))
    }

    pub fn random_hint(&self) -> Option<&str> {
        self.extra_hints.choose(&mut rand::rng()).map(String::as_str)
    }
}

fn split_list(raw: &str, separator: &str) -> Vec<String> {
    raw.split(separator)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("DISCORD_TOKEN", "main")]).unwrap();

        assert_eq!(config.prefix, "!");
        assert_eq!(config.queue_max_entries, 1000);
        assert_eq!(config.lavalink_url, "http://127.0.0.1:2333");
        assert!(config.pool_tokens.is_empty());
        assert!(config.error_report_webhook.is_none());
        assert!(config.random_hint().is_none());
        assert_eq!(config.tokens().collect::<Vec<_>>(), vec!["main"]);
    }

    #[test]
    fn test_lists_are_split_and_trimmed() {
        let config = config(&[
            ("DISCORD_TOKEN", "main"),
            ("POOL_TOKENS", "a, b,,c "),
            ("EXTRA_HINTS", "Try /search|| Use -force to skip ahead ||"),
        ])
        .unwrap();

        assert_eq!(config.tokens().collect::<Vec<_>>(), vec!["main", "a", "b", "c"]);
        assert_eq!(config.extra_hints, vec!["Try /search", "Use -force to skip ahead"]);
        assert!(config.random_hint().is_some_and(|hint| config.extra_hints.iter().any(|h| h == hint)));
    }

    #[test]
    fn test_missing_token() {
        assert_eq!(config(&[]), Err(ConfigError::Missing("DISCORD_TOKEN")));
        assert_eq!(config(&[("DISCORD_TOKEN", "  ")]), Err(ConfigError::Missing("DISCORD_TOKEN")));
    }

    #[test]
    fn test_invalid_queue_limit() {
        assert_eq!(
            config(&[("DISCORD_TOKEN", "main"), ("QUEUE_MAX_ENTRIES", "lots")]),
            Err(ConfigError::Invalid {
                name: "QUEUE_MAX_ENTRIES",
                value: "lots".into()
            })
        );
        assert!(config(&[("DISCORD_TOKEN", "main"), ("QUEUE_MAX_ENTRIES", "0")]).is_err());
    }
}
