//! Application configuration
//!
//! Every component receives its section at construction time. Values come
//! from an optional TOML file, overridden by `CHAT_CONTEXT__SECTION__KEY`
//! environment variables.

use crate::error::{ContextError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "CHAT_CONTEXT";

/// Upper bound for `summary.update_threshold_hours` (100 years)
pub const MAX_SUMMARY_THRESHOLD_HOURS: u64 = 24 * 365 * 100;

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub autocomplete: AutocompleteConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
}

impl Config {
    /// Load configuration from a TOML file (missing file is allowed) plus environment
    pub fn from_file(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config: Config = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make a component unusable
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("server.port must be greater than 0"));
        }
        if self.llm.timeout_ms == 0 {
            return Err(invalid("llm.timeout_ms must be greater than 0"));
        }
        if self.context.max_context_tokens == 0 {
            return Err(invalid("context.max_context_tokens must be greater than 0"));
        }
        if self.context.recent_messages_count == 0 {
            return Err(invalid("context.recent_messages_count must be greater than 0"));
        }
        if self.summary.update_threshold_hours > MAX_SUMMARY_THRESHOLD_HOURS {
            return Err(ContextError::Configuration(format!(
                "summary.update_threshold_hours must be at most {}",
                MAX_SUMMARY_THRESHOLD_HOURS
            )));
        }
        if self.autocomplete.suggestion_count == 0 {
            return Err(invalid("autocomplete.suggestion_count must be greater than 0"));
        }
        if self.workers.refresh_workers == 0 {
            return Err(invalid("workers.refresh_workers must be greater than 0"));
        }
        if self.workers.refresh_queue_capacity == 0 {
            return Err(invalid("workers.refresh_queue_capacity must be greater than 0"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ContextError {
    ContextError::Configuration(message.to_string())
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum accepted request body in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// OpenAI-compatible model endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default)]
    pub frequency_penalty: f32,

    #[serde(default)]
    pub presence_penalty: f32,

    /// Upper bound for a single provider call, retries included
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    256
}

fn default_top_p() -> f32 {
    1.0
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> usize {
    2
}

fn default_retry_backoff_ms() -> u64 {
    200
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Context assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Budget for the assembled context, in estimated tokens (chars / 3)
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,

    /// Size of the recent-message window
    #[serde(default = "default_recent_messages")]
    pub recent_messages_count: usize,

    /// Characters reserved for the truncation marker
    #[serde(default = "default_truncation_headroom")]
    pub truncation_headroom_chars: usize,
}

fn default_max_context_tokens() -> usize {
    2000
}

fn default_recent_messages() -> usize {
    20
}

fn default_truncation_headroom() -> usize {
    100
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: default_max_context_tokens(),
            recent_messages_count: default_recent_messages(),
            truncation_headroom_chars: default_truncation_headroom(),
        }
    }
}

/// Rolling summary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default = "default_summary_threshold_messages")]
    pub update_threshold_messages: u64,

    #[serde(default = "default_summary_threshold_hours")]
    pub update_threshold_hours: u64,

    #[serde(default = "default_max_summary_tokens")]
    pub max_summary_tokens: u32,

    #[serde(default = "default_key_info_count")]
    pub key_info_count: usize,

    /// How many of the latest messages the summarizer embeds in its prompt
    #[serde(default = "default_prompt_message_window")]
    pub prompt_message_window: usize,

    #[serde(default = "default_true")]
    pub auto_update: bool,
}

fn default_summary_threshold_messages() -> u64 {
    50
}

fn default_summary_threshold_hours() -> u64 {
    24
}

fn default_max_summary_tokens() -> u32 {
    500
}

fn default_key_info_count() -> usize {
    10
}

fn default_prompt_message_window() -> usize {
    100
}

fn default_true() -> bool {
    true
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            update_threshold_messages: default_summary_threshold_messages(),
            update_threshold_hours: default_summary_threshold_hours(),
            max_summary_tokens: default_max_summary_tokens(),
            key_info_count: default_key_info_count(),
            prompt_message_window: default_prompt_message_window(),
            auto_update: true,
        }
    }
}

impl SummaryConfig {
    /// Values above [`MAX_SUMMARY_THRESHOLD_HOURS`] are clamped
    pub fn time_threshold(&self) -> chrono::Duration {
        let hours = self.update_threshold_hours.min(MAX_SUMMARY_THRESHOLD_HOURS);
        chrono::Duration::hours(hours as i64)
    }
}

/// Style learning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_style_threshold_messages")]
    pub update_threshold_messages: u64,
}

fn default_style_threshold_messages() -> u64 {
    20
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            update_threshold_messages: default_style_threshold_messages(),
        }
    }
}

/// Autocomplete configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutocompleteConfig {
    /// Inputs shorter than this (in characters) never reach the provider
    #[serde(default = "default_min_trigger_length")]
    pub min_trigger_length: usize,

    #[serde(default = "default_suggestion_count")]
    pub suggestion_count: usize,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_min_trigger_length() -> usize {
    2
}

fn default_suggestion_count() -> usize {
    3
}

fn default_debounce_ms() -> u64 {
    300
}

impl Default for AutocompleteConfig {
    fn default() -> Self {
        Self {
            min_trigger_length: default_min_trigger_length(),
            suggestion_count: default_suggestion_count(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl AutocompleteConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Background refresh worker pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_refresh_workers")]
    pub refresh_workers: usize,

    #[serde(default = "default_refresh_queue_capacity")]
    pub refresh_queue_capacity: usize,
}

fn default_refresh_workers() -> usize {
    4
}

fn default_refresh_queue_capacity() -> usize {
    256
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            refresh_workers: default_refresh_workers(),
            refresh_queue_capacity: default_refresh_queue_capacity(),
        }
    }
}
