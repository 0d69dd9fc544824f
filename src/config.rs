//! Configuration loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Bot identity and presence.
    pub bot: BotConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Name of the environment variable holding the gateway token.
    /// The token itself never lives in the config file.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Optional presence line shown under the bot's name.
    #[serde(default)]
    pub status: Option<String>,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path, or ":memory:".
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_token_env() -> String {
    "BOT_TOKEN".to_string()
}

fn default_db_path() -> String {
    "data/musterbot.db".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_full_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [bot]
            token_env = "MUSTER_TOKEN"
            status = "watching the reaction queue"

            [database]
            path = "/tmp/muster-test.db"
            "#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.bot.token_env, "MUSTER_TOKEN");
        assert_eq!(
            config.bot.status.as_deref(),
            Some("watching the reaction queue")
        );
        assert_eq!(config.database.path, "/tmp/muster-test.db");
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[bot]\n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.bot.token_env, "BOT_TOKEN");
        assert!(config.bot.status.is_none());
        assert_eq!(config.database.path, "data/musterbot.db");
    }

    #[test]
    fn parse_errors_are_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not toml at all [").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
