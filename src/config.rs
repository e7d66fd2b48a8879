use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
}

/// Everything the job needs, resolved once at startup so that a missing
/// setting fails before any network call.
#[derive(Debug, Clone)]
pub struct Config {
    pub keyword: String,
    pub ledger_path: String,
    pub line_token: String,
    pub line_api_url: String,
    pub twitter_api_key: String,
    pub twitter_api_secret: String,
    pub twitter_access_token: String,
    pub twitter_access_token_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let require = |name: &'static str| -> Result<String, ConfigError> {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
                _ => Err(ConfigError::Missing(name)),
            }
        };

        Ok(Self {
            keyword: require("KEYWORD")?,
            ledger_path: require("LEDGER_PATH")?,
            line_token: require("LINE_TOKEN")?,
            line_api_url: require("LINE_API_URL")?,
            twitter_api_key: require("TWITTER_API_KEY")?,
            twitter_api_secret: require("TWITTER_API_SECRET")?,
            twitter_access_token: require("TWITTER_ACCESS_TOKEN")?,
            twitter_access_token_secret: require("TWITTER_ACCESS_TOKEN_SECRET")?,
        })
    }
}
