use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub api_id: Option<i32>,
    #[serde(default)]
    pub api_hash: String,
    #[serde(default)]
    pub phone_number: String,
    /// Username of the bot every query is relayed to, with or without the leading `@`.
    #[serde(default = "default_bot_username")]
    pub bot_username: String,
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Echo the bot's unparsed reply in successful search responses.
    #[serde(default)]
    pub include_raw_response: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_reply_window_secs")]
    pub reply_window_secs: u64,
    #[serde(default = "default_round_trip_timeout_secs")]
    pub round_trip_timeout_secs: u64,
}

impl GatewayConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn reply_window(&self) -> Duration {
        Duration::from_secs(self.reply_window_secs)
    }

    pub fn round_trip_timeout(&self) -> Duration {
        Duration::from_secs(self.round_trip_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Digits that must follow the `+` of every query, e.g. "91".
    #[serde(default = "default_country_code")]
    pub country_code: String,
}

fn default_bot_username() -> String {
    "ZaverinBot".to_string()
}

fn default_session_file() -> PathBuf {
    PathBuf::from("leakosint.session")
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_service_name() -> String {
    "Leakosint Search API".to_string()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_reply_window_secs() -> u64 {
    5
}

fn default_round_trip_timeout_secs() -> u64 {
    30
}

fn default_country_code() -> String {
    "91".to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_id: None,
            api_hash: String::new(),
            phone_number: String::new(),
            bot_username: default_bot_username(),
            session_file: default_session_file(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            service_name: default_service_name(),
            include_raw_response: false,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            reply_window_secs: default_reply_window_secs(),
            round_trip_timeout_secs: default_round_trip_timeout_secs(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            country_code: default_country_code(),
        }
    }
}

impl Config {
    /// Load `path` if it exists, layer the process environment on top and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Config::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override file values with environment variables. `lookup` is injected so
    /// tests don't have to touch the real process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_id) = lookup("API_ID") {
            let parsed = api_id
                .trim()
                .parse::<i32>()
                .with_context(|| format!("API_ID must be an integer, got '{}'", api_id))?;
            self.telegram.api_id = Some(parsed);
        }
        if let Some(api_hash) = lookup("API_HASH") {
            self.telegram.api_hash = api_hash.trim().to_string();
        }
        if let Some(phone) = lookup("PHONE_NUMBER") {
            self.telegram.phone_number = phone.trim().to_string();
        }
        if let Some(bot) = lookup("BOT_USERNAME") {
            self.telegram.bot_username = bot.trim().to_string();
        }
        if let Some(session) = lookup("SESSION_FILE") {
            self.telegram.session_file = PathBuf::from(session);
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{}'", port))?;
        }
        if let Some(flag) = lookup("INCLUDE_RAW_RESPONSE") {
            self.server.include_raw_response =
                matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    /// Refuse to start on missing or placeholder credentials.
    pub fn validate(&self) -> Result<()> {
        match self.telegram.api_id {
            Some(id) if id > 0 => {}
            Some(id) => anyhow::bail!("telegram api_id must be positive, got {}", id),
            None => anyhow::bail!("telegram api_id is not set (config [telegram] or API_ID)"),
        }

        let api_hash = self.telegram.api_hash.trim();
        if api_hash.is_empty() || api_hash.starts_with("YOUR_") {
            anyhow::bail!("telegram api_hash is not set (config [telegram] or API_HASH)");
        }

        let phone = self.telegram.phone_number.trim();
        if phone.is_empty() || phone.starts_with("YOUR_") {
            anyhow::bail!("telegram phone_number is not set (config [telegram] or PHONE_NUMBER)");
        }

        if self.bot_username().is_empty() {
            anyhow::bail!("telegram bot_username must not be empty");
        }

        let cc = &self.search.country_code;
        if cc.is_empty() || !cc.chars().all(|c| c.is_ascii_digit()) {
            anyhow::bail!("search country_code must be digits only, got '{}'", cc);
        }

        if self.gateway.poll_interval_ms == 0 {
            anyhow::bail!("gateway poll_interval_ms must be greater than zero");
        }
        if self.gateway.reply_window() > self.gateway.round_trip_timeout() {
            anyhow::bail!(
                "gateway reply_window_secs ({}) exceeds round_trip_timeout_secs ({})",
                self.gateway.reply_window_secs,
                self.gateway.round_trip_timeout_secs
            );
        }

        Ok(())
    }

    /// Bot username without the leading `@`.
    pub fn bot_username(&self) -> &str {
        self.telegram.bot_username.trim().trim_start_matches('@')
    }
}
