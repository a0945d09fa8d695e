use std::env;

use anyhow::{bail, Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Redis,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub store: StoreKind,
    pub redis_url: String,
    pub static_dir: String,
    pub webhook_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub notify_actions: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            store: StoreKind::Redis,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            static_dir: "frontend/dist".to_string(),
            webhook_url: None,
            openai_api_key: None,
            openai_model: "gpt-3.5-turbo-instruct".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            notify_actions: false,
        }
    }
}

impl Config {
    /// Reads the process environment. Call `dotenv::dotenv()` first to pick
    /// up a local `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        // blank values count as unset, the way an empty line in .env reads
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got {raw:?}"))?,
            None => defaults.port,
        };

        let store = match var("STORE").as_deref().map(str::trim) {
            None | Some("redis") => StoreKind::Redis,
            Some("memory") => StoreKind::Memory,
            Some(other) => bail!("STORE must be \"redis\" or \"memory\", got {other:?}"),
        };

        let notify_actions = match var("NOTIFY_ACTIONS").as_deref().map(str::trim) {
            None => false,
            Some("1" | "true" | "yes" | "on") => true,
            Some("0" | "false" | "no" | "off") => false,
            Some(other) => bail!("NOTIFY_ACTIONS must be a boolean, got {other:?}"),
        };

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port,
            store,
            redis_url: var("REDIS_URL").unwrap_or(defaults.redis_url),
            static_dir: var("STATIC_DIR").unwrap_or(defaults.static_dir),
            webhook_url: var("SLACK_WEBHOOK_URL"),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_model: var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_base_url: var("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            notify_actions,
        })
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
