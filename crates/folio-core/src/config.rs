//! Configuration management for Folio
//!
//! Values are layered: built-in defaults, then an optional config file, then
//! `FOLIO__SECTION__KEY` environment variables, then the plain variables the
//! site has always been deployed with (`OPENAI_API_KEY`, `SERVER_PORT`, ...).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default persona preamble sent ahead of every visitor message
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant for Tahira's portfolio website. \
You help visitors with questions about Tahira's skills, experience, projects, and how to contact them. \
Keep responses friendly, professional, and concise. If you don't know something specific about Tahira, \
suggest they use the contact form.";

/// Plain environment variables honoured for existing deployments, and their keys
const COMPAT_ENV: &[(&str, &str)] = &[
    ("OPENAI_API_KEY", "completion.api_key"),
    ("SERVER_PORT", "server.port"),
    ("EMAIL_USER", "contact.inbox"),
    ("EMAIL_PASS", "contact.relay_token"),
];

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Completion service configuration
    pub completion: CompletionConfig,

    /// Chat endpoint configuration
    pub chat: ChatConfig,

    /// Analytics configuration
    pub analytics: AnalyticsConfig,

    /// Contact relay configuration
    pub contact: ContactConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("FOLIO")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.allowed_origins")
                .try_parsing(true),
        );

        for (var, key) in COMPAT_ENV {
            if let Ok(value) = std::env::var(var) {
                if !value.trim().is_empty() {
                    builder = builder.set_override(*key, value)?;
                }
            }
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the services cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::config("server.port must be non-zero"));
        }
        if self.completion.timeout_ms == 0 {
            return Err(Error::config("completion.timeout_ms must be non-zero"));
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(Error::config("completion.temperature must be within 0..=2"));
        }
        if self.analytics.response_time_capacity == 0 {
            return Err(Error::config(
                "analytics.response_time_capacity must be non-zero",
            ));
        }
        if self.analytics.token_average_threshold < 0.0
            || self.analytics.cost_average_threshold < 0.0
            || self.analytics.error_rate_threshold < 0.0
        {
            return Err(Error::config("analytics thresholds must not be negative"));
        }
        if matches!(self.analytics.cost_per_1k_tokens, Some(rate) if rate < 0.0) {
            return Err(Error::config("analytics.cost_per_1k_tokens must not be negative"));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// HTTP API port
    pub port: u16,
    /// Origins allowed by CORS (empty = any)
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Socket address string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Completion service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// API credential; absent or placeholder means demo mode
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Completion token cap
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Hard deadline for one completion call
    pub timeout_ms: u64,
    /// Persona preamble
    pub system_prompt: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 300,
            temperature: 0.7,
            timeout_ms: 10_000,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl CompletionConfig {
    /// Completion deadline as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Chat endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Custom canned response table (JSON); the built-in table when unset
    pub responses_path: Option<String>,
    /// Number of trailing history turns forwarded as context
    pub history_limit: usize,
    /// Artificial delay added after every answer, 0 disables it
    pub response_delay_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            responses_path: None,
            history_limit: 5,
            response_delay_ms: 800,
        }
    }
}

impl ChatConfig {
    /// Artificial delay as a duration
    pub fn response_delay(&self) -> Duration {
        Duration::from_millis(self.response_delay_ms)
    }
}

/// Analytics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Number of recent response times kept
    pub response_time_capacity: usize,
    /// Requests slower than this count as slow
    pub slow_request_ms: u64,
    /// Fixed price per 1000 tokens; derived from the model when unset
    pub cost_per_1k_tokens: Option<f64>,
    /// Average tokens per external response that trips the token alert
    pub token_average_threshold: f64,
    /// Average cost per external response that trips the cost alert
    pub cost_average_threshold: f64,
    /// Error percentage that trips the error spike alert
    pub error_rate_threshold: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            response_time_capacity: 100,
            slow_request_ms: 3000,
            cost_per_1k_tokens: None,
            token_average_threshold: 500.0,
            cost_average_threshold: 0.10,
            error_rate_threshold: 20.0,
        }
    }
}

/// Contact relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactConfig {
    /// Mail relay endpoint accepting `{from, to, subject, html}` JSON
    pub relay_url: Option<String>,
    /// Bearer token for the relay
    pub relay_token: Option<String>,
    /// Address receiving contact notifications
    pub inbox: Option<String>,
    /// From address (defaults to the inbox)
    pub sender: Option<String>,
    /// Name used to sign auto-replies
    pub owner_name: String,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            relay_url: None,
            relay_token: None,
            inbox: None,
            sender: None,
            owner_name: "Tahira".to_string(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: LogFormat,
    /// Directory for daily-rolling JSON log files
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            directory: None,
        }
    }
}
