//! Main settings module

use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation
    #[default]
    Development,
    /// Staging mode
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Session engine configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Model backend configuration
    #[serde(default)]
    pub llm: ModelConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.retention_window < 2 {
            return Err(ConfigError::InvalidValue {
                field: "engine.retention_window".to_string(),
                message: "must retain at least version 1 and the current version".to_string(),
            });
        }
        if self.engine.edit_budget_ms < 500 {
            return Err(ConfigError::InvalidValue {
                field: "engine.edit_budget_ms".to_string(),
                message: "edit budget too low (minimum 500ms)".to_string(),
            });
        }
        if self.llm.timeout_ms >= self.engine.edit_budget_ms {
            return Err(ConfigError::InvalidValue {
                field: "llm.timeout_ms".to_string(),
                message: "per-call model timeout must fit inside the edit budget".to_string(),
            });
        }
        if self.engine.lock_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.lock_timeout_ms".to_string(),
                message: "lock acquisition must have a bounded, non-zero timeout".to_string(),
            });
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

/// Session engine knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Idle time after which a session expires.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Versions kept with full bodies before compaction.
    #[serde(default = "default_retention_window")]
    pub retention_window: usize,

    /// End-to-end deadline for one edit.
    #[serde(default = "default_edit_budget_ms")]
    pub edit_budget_ms: u64,

    /// Per-session lock acquisition timeout.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Janitor sweep interval.
    #[serde(default = "default_janitor_interval_ms")]
    pub janitor_interval_ms: u64,
}

fn default_session_ttl_secs() -> u64 {
    24 * 60 * 60
}
fn default_retention_window() -> usize {
    20
}
fn default_edit_budget_ms() -> u64 {
    5_000
}
fn default_lock_timeout_ms() -> u64 {
    30_000
}
fn default_janitor_interval_ms() -> u64 {
    60_000
}

impl EngineConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn edit_budget(&self) -> Duration {
        Duration::from_millis(self.edit_budget_ms)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn janitor_interval(&self) -> Duration {
        Duration::from_millis(self.janitor_interval_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl_secs(),
            retention_window: default_retention_window(),
            edit_budget_ms: default_edit_budget_ms(),
            lock_timeout_ms: default_lock_timeout_ms(),
            janitor_interval_ms: default_janitor_interval_ms(),
        }
    }
}

/// Model backend knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-call model timeout.
    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra attempts after the first on transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial retry backoff; doubles per attempt, +/-20% jitter.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_model() -> String {
    "qwen2.5:7b-instruct-q4_K_M".to_string()
}
fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}
fn default_llm_timeout_ms() -> u64 {
    3_000
}
fn default_max_retries() -> u32 {
    2
}
fn default_backoff_base_ms() -> u64 {
    500
}
fn default_max_tokens() -> usize {
    2048
}
fn default_temperature() -> f32 {
    0.2
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
            api_key: None,
            timeout_ms: default_llm_timeout_ms(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Load settings from files and environment.
///
/// Priority: env vars > `config/{env}.yaml` > `config/default.yaml` >
/// serde defaults.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder =
        Config::builder().add_source(File::with_name("config/default").required(false));

    if let Some(env) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env)).required(false));
    }

    let settings: Settings = builder
        .add_source(Environment::with_prefix("WIREFRAME").separator("__"))
        .build()?
        .try_deserialize()?;

    settings.validate()?;
    tracing::debug!(environment = ?settings.environment, "configuration loaded");
    Ok(settings)
}

/// Load settings from one explicit file. Used by tests and tooling.
pub fn load_from_file(path: &std::path::Path) -> Result<Settings, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }
    let settings: Settings = Config::builder()
        .add_source(File::from(path))
        .build()?
        .try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}
