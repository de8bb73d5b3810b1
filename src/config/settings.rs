use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::client::{BackoffConfig, ClientOptions, Endpoint};
use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Backend partition, sent as `company_id`
    #[serde(default = "default_tenant_id")]
    pub tenant_id: String,
    /// Externally persisted session id; generated by the caller when absent
    #[serde(default)]
    pub session_id: Option<String>,
    /// WebSocket endpoint (`ws://` or `wss://`)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Delay unit for linear reconnect backoff, in milliseconds
    #[serde(default = "default_base_reconnect_delay_ms")]
    pub base_reconnect_delay_ms: u64,
    /// Upper bound for a single reconnect delay, in milliseconds
    #[serde(default)]
    pub max_reconnect_delay_ms: Option<u64>,
    /// Jitter factor (0.0 to 1.0) applied to each reconnect delay
    #[serde(default)]
    pub reconnect_jitter: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human readable output
    #[serde(default)]
    pub json: bool,
}

fn default_tenant_id() -> String {
    "1".to_string()
}

fn default_base_url() -> String {
    "ws://localhost:8001".to_string()
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_base_reconnect_delay_ms() -> u64 {
    2000 // 2 seconds
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn new() -> std::result::Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("client.tenant_id", "1")?
            .set_default("client.base_url", "ws://localhost:8001")?
            .set_default("client.max_reconnect_attempts", 5)?
            .set_default("client.base_reconnect_delay_ms", 2000)?
            .set_default("logging.level", "info")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // SALES_AGENT__CLIENT__BASE_URL, SALES_AGENT__LOGGING__JSON, etc.
            .add_source(
                Environment::with_prefix("SALES_AGENT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

impl ClientConfig {
    /// Check the values a session cannot run without.
    pub fn validate(&self) -> Result<()> {
        if self.tenant_id.trim().is_empty() {
            return Err(ClientError::Validation(
                "tenant_id must not be empty".to_string(),
            ));
        }
        if let Some(session_id) = &self.session_id {
            if session_id.trim().is_empty() {
                return Err(ClientError::Validation(
                    "session_id must not be empty".to_string(),
                ));
            }
        }
        if self.base_reconnect_delay_ms == 0 {
            return Err(ClientError::Validation(
                "base_reconnect_delay_ms must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.reconnect_jitter) {
            return Err(ClientError::Validation(
                "reconnect_jitter must be between 0.0 and 1.0".to_string(),
            ));
        }
        // Scheme and shape are checked by the endpoint parser
        Endpoint::new(&self.tenant_id, "probe", &self.base_url)?;
        Ok(())
    }

    /// Build manager options for the given session.
    pub fn to_options(&self, session_id: &str) -> Result<ClientOptions> {
        self.validate()?;
        let endpoint = Endpoint::new(&self.tenant_id, session_id, &self.base_url)?;
        Ok(ClientOptions {
            endpoint,
            max_reconnect_attempts: self.max_reconnect_attempts,
            backoff: BackoffConfig {
                base_delay_ms: self.base_reconnect_delay_ms,
                max_delay_ms: self.max_reconnect_delay_ms,
                jitter_factor: self.reconnect_jitter,
            },
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tenant_id: default_tenant_id(),
            session_id: None,
            base_url: default_base_url(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            base_reconnect_delay_ms: default_base_reconnect_delay_ms(),
            max_reconnect_delay_ms: None,
            reconnect_jitter: 0.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
