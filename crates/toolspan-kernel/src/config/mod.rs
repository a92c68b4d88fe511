//! Backend configuration
//!
//! Tracing backends are configured from the process environment:
//!
//! | variable | default |
//! |----------|---------|
//! | `OPENLUMIX_URL` | `http://localhost:4000/v1/traces` |
//! | `OPENLUMIX_PROJECT_ID` | `default` |
//! | `PHOENIX_UI_PORT` | `6006` |
//!
//! Values are read through the `config` crate's [`Environment`] source so
//! tests can inject a map instead of mutating the process environment.

use crate::error::{KernelError, KernelResult};
use config::{Config as Cfg, Environment};
use error_stack::{Report, ResultExt};
use serde::Deserialize;

pub const DEFAULT_OPENLUMIX_URL: &str = "http://localhost:4000/v1/traces";
pub const DEFAULT_OPENLUMIX_PROJECT_ID: &str = "default";
pub const DEFAULT_PHOENIX_PORT: u16 = 6006;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Invalid value: {0}")]
    Invalid(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// OpenLumix collector settings (HTTP+JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OpenLumixConfig {
    /// Full OTLP traces URL
    pub url: String,
    /// Sent as `x-openlumix-project-id`
    pub project_id: String,
}

impl Default for OpenLumixConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_OPENLUMIX_URL.to_string(),
            project_id: DEFAULT_OPENLUMIX_PROJECT_ID.to_string(),
        }
    }
}

impl OpenLumixConfig {
    /// Read `OPENLUMIX_URL` / `OPENLUMIX_PROJECT_ID`
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_environment(Environment::with_prefix("OPENLUMIX"))
    }

    pub fn from_environment(environment: Environment) -> ConfigResult<Self> {
        let config: Self = Cfg::builder()
            .set_default("url", DEFAULT_OPENLUMIX_URL)?
            .set_default("project_id", DEFAULT_OPENLUMIX_PROJECT_ID)?
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        if config.url.trim().is_empty() {
            return Err(ConfigError::Invalid("OPENLUMIX_URL is empty".to_string()));
        }
        Ok(config)
    }
}

/// Phoenix collector settings (HTTP+protobuf)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PhoenixConfig {
    pub ui_port: u16,
}

impl Default for PhoenixConfig {
    fn default() -> Self {
        Self {
            ui_port: DEFAULT_PHOENIX_PORT,
        }
    }
}

impl PhoenixConfig {
    /// Read `PHOENIX_UI_PORT`
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_environment(Environment::with_prefix("PHOENIX").try_parsing(true))
    }

    pub fn from_environment(environment: Environment) -> ConfigResult<Self> {
        Ok(Cfg::builder()
            .set_default("ui_port", i64::from(DEFAULT_PHOENIX_PORT))?
            .add_source(environment)
            .build()?
            .try_deserialize()?)
    }

    /// OTLP traces endpoint
    pub fn collector_endpoint(&self) -> String {
        format!("http://localhost:{}/v1/traces", self.ui_port)
    }

    /// GraphQL endpoint used for the metrics read-back
    pub fn graphql_endpoint(&self) -> String {
        format!("http://localhost:{}/graphql", self.ui_port)
    }

    /// Projects page of the Phoenix UI
    pub fn projects_url(&self) -> String {
        format!("http://localhost:{}/projects", self.ui_port)
    }
}

/// Settings for every supported backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendSettings {
    pub openlumix: OpenLumixConfig,
    pub phoenix: PhoenixConfig,
}

impl BackendSettings {
    /// Read both backends from the process environment
    pub fn from_env() -> KernelResult<Self> {
        Self::from_environments(
            Environment::with_prefix("OPENLUMIX"),
            Environment::with_prefix("PHOENIX").try_parsing(true),
        )
    }

    pub fn from_environments(openlumix: Environment, phoenix: Environment) -> KernelResult<Self> {
        let openlumix = OpenLumixConfig::from_environment(openlumix)
            .map_err(|e| Report::new(KernelError::from(e)))
            .attach("reading OPENLUMIX_* environment")?;
        let phoenix = PhoenixConfig::from_environment(phoenix)
            .map_err(|e| Report::new(KernelError::from(e)))
            .attach("reading PHOENIX_* environment")?;
        Ok(Self { openlumix, phoenix })
    }
}
