use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::registry::Recipients;

pub const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const ADMINS_ENV: &str = "ADMIN_CHAT_ID";

/// Immutable process configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub recipients: Recipients,
    pub messages: MessagesConfig,
}

/// User-facing texts. Every field has a default.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MessagesConfig {
    pub greeting: String,
    pub delivered: String,
    pub failed: String,
    /// Notice sent to each recipient before the forward. `{sender}` is replaced
    /// with the sender label.
    pub sender_notice: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            greeting: "Hi! Send a screenshot or a message and it will be delivered to the bot owner."
                .to_string(),
            delivered: "✓ Delivered!".to_string(),
            failed: "Could not send your message. Please try again later.".to_string(),
            sender_notice: "From: {sender}".to_string(),
        }
    }
}

impl MessagesConfig {
    pub fn sender_notice(&self, sender: &str) -> String {
        self.sender_notice.replace("{sender}", sender)
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    telegram: TelegramSection,
    #[serde(default)]
    messages: MessagesConfig,
}

#[derive(Debug, Deserialize, Default)]
struct TelegramSection {
    #[serde(default)]
    bot_token: String,
    #[serde(default)]
    admin_chat_ids: Vec<ChatIdEntry>,
}

/// Admin chat ids may be written as TOML integers or strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatIdEntry {
    Int(i64),
    Str(String),
}

impl ChatIdEntry {
    fn into_token(self) -> String {
        match self {
            ChatIdEntry::Int(id) => id.to_string(),
            ChatIdEntry::Str(s) => s,
        }
    }
}

impl Config {
    /// Load `.env`, the optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let content = match path {
            Some(path) => Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?,
            ),
            None => None,
        };

        Self::from_sources(content.as_deref(), |key| std::env::var(key).ok())
    }

    /// Merge file content with variables from `env`. Environment values win.
    pub fn from_sources(
        file: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let file: FileConfig = match file {
            Some(content) => toml::from_str(content).context("Failed to parse config file")?,
            None => FileConfig::default(),
        };

        let bot_token = env(TOKEN_ENV)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(file.telegram.bot_token)
            .trim()
            .to_string();
        if bot_token.is_empty() {
            bail!("{TOKEN_ENV} is not set (environment, .env or [telegram] bot_token)");
        }

        let recipients = match env(ADMINS_ENV) {
            Some(raw) => Recipients::parse(&raw),
            None => Recipients::new(
                file.telegram
                    .admin_chat_ids
                    .into_iter()
                    .map(ChatIdEntry::into_token),
            ),
        };

        Ok(Config {
            bot_token,
            recipients,
            messages: file.messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn ids(cfg: &Config) -> Vec<String> {
        cfg.recipients.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_env_only() {
        let cfg = Config::from_sources(
            None,
            env_of(&[(TOKEN_ENV, "123:abc"), (ADMINS_ENV, "100, 200 ,")]),
        )
        .unwrap();
        assert_eq!(cfg.bot_token, "123:abc");
        assert_eq!(ids(&cfg), vec!["100", "200"]);
        assert_eq!(cfg.messages, MessagesConfig::default());
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let err = Config::from_sources(None, env_of(&[(ADMINS_ENV, "100")])).unwrap_err();
        assert!(err.to_string().contains(TOKEN_ENV));

        let blank = Config::from_sources(None, env_of(&[(TOKEN_ENV, "   ")]));
        assert!(blank.is_err());
    }

    #[test]
    fn test_missing_admins_still_loads() {
        let cfg = Config::from_sources(None, env_of(&[(TOKEN_ENV, "t")])).unwrap();
        assert!(cfg.recipients.is_empty());

        let cfg =
            Config::from_sources(None, env_of(&[(TOKEN_ENV, "t"), (ADMINS_ENV, " ")])).unwrap();
        assert!(cfg.recipients.is_empty());
    }

    #[test]
    fn test_file_config_with_mixed_ids() {
        let toml = r#"
            [telegram]
            bot_token = "file-token"
            admin_chat_ids = [123456, "-1001234567890", " @news ", ""]

            [messages]
            delivered = "Got it"
        "#;
        let cfg = Config::from_sources(Some(toml), env_of(&[])).unwrap();
        assert_eq!(cfg.bot_token, "file-token");
        assert_eq!(ids(&cfg), vec!["123456", "-1001234567890", "@news"]);
        assert_eq!(cfg.messages.delivered, "Got it");
        assert_eq!(cfg.messages.failed, MessagesConfig::default().failed);
    }

    #[test]
    fn test_env_overrides_file() {
        let toml = r#"
            [telegram]
            bot_token = "file-token"
            admin_chat_ids = [1, 2]
        "#;
        let cfg = Config::from_sources(
            Some(toml),
            env_of(&[(TOKEN_ENV, "env-token"), (ADMINS_ENV, "3")]),
        )
        .unwrap();
        assert_eq!(cfg.bot_token, "env-token");
        assert_eq!(ids(&cfg), vec!["3"]);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let err = Config::from_sources(Some("[telegram"), env_of(&[(TOKEN_ENV, "t")]));
        assert!(err.is_err());
    }

    #[test]
    fn test_sender_notice_template() {
        let messages = MessagesConfig::default();
        assert_eq!(messages.sender_notice("@alice"), "From: @alice");
    }
}
