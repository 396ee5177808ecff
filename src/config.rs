//! Configuration and settings management
//!
//! Loads settings from environment variables and defines tuning constants
//! for the stores and publish pipeline.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Generation Service webhook endpoint
    pub webhook_url: String,

    /// Telegram channel the bot publishes inline articles to
    pub channel_id: i64,

    /// Connect/read timeout for Generation Service calls, seconds
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,

    /// Baserow table rows endpoint; together with the token enables the
    /// tabular publish strategy for site articles
    pub baserow_api_url: Option<String>,
    /// Baserow API token
    pub baserow_token: Option<String>,

    /// ImgBB API key; enables image rehosting during tabular publish
    pub imgbb_api_key: Option<String>,
    /// ImgBB upload endpoint
    #[serde(default = "default_imgbb_upload_url")]
    pub imgbb_upload_url: String,
}

const fn default_generation_timeout_secs() -> u64 {
    120
}

fn default_imgbb_upload_url() -> String {
    "https://api.imgbb.com/1/upload".to_string()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use newsroom_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(File::with_name("config/default").required(false))
            // Add in the current environment file
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked into git
            .add_source(File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of APP)
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Also add settings from environment variables directly (without prefix)
            // Note: Environment::default() auto-converts UPPER_SNAKE_CASE to snake_case
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;

        // Fallback: Check environment variables directly if config didn't pick them up
        if settings.baserow_api_url.is_none() {
            if let Ok(val) = std::env::var("BASEROW_API_URL") {
                if !val.is_empty() {
                    settings.baserow_api_url = Some(val);
                }
            }
        }
        if settings.baserow_token.is_none() {
            if let Ok(val) = std::env::var("BASEROW_TOKEN") {
                if !val.is_empty() {
                    settings.baserow_token = Some(val);
                }
            }
        }
        if settings.imgbb_api_key.is_none() {
            if let Ok(val) = std::env::var("IMGBB_API_KEY") {
                if !val.is_empty() {
                    settings.imgbb_api_key = Some(val);
                }
            }
        }

        Ok(settings)
    }

    /// Whether site articles go to the tabular store instead of the
    /// generation webhook's publish action
    #[must_use]
    pub fn tabular_publish_enabled(&self) -> bool {
        self.baserow_api_url.is_some() && self.baserow_token.is_some()
    }
}

/// Telegram caption limit for photo messages, in characters
pub const CAPTION_LIMIT: usize = 1024;

/// Public view link prefix for external documents
pub const GOOGLE_DOCS_URL_PREFIX: &str = "https://docs.google.com/document/d/";

// Store sizing. Records are removed explicitly on reset/resolve; TTLs only
// bound memory for chats that went silent mid-dialog.
/// Conversation record TTL (12 hours)
pub const CONVERSATION_TTL_SECS: u64 = 12 * 60 * 60;
/// Maximum concurrent conversation records
pub const CONVERSATION_MAX_CAPACITY: u64 = 10_000;
/// Cached article TTL (24 hours)
pub const RESULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;
/// Maximum cached articles
pub const RESULT_CACHE_MAX_CAPACITY: u64 = 10_000;
/// Greeted-chat membership TTL (7 days)
pub const GREETED_TTL_SECS: u64 = 7 * 24 * 60 * 60;
/// Maximum greeted-chat entries
pub const GREETED_MAX_CAPACITY: u64 = 100_000;

/// Idle period after which a per-chat worker exits
pub const CHAT_WORKER_IDLE_SECS: u64 = 5 * 60;

/// Character cap for response-body excerpts embedded in errors and logs
pub const ERROR_BODY_PREVIEW_CHARS: usize = 500;
