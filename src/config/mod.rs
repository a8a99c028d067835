//! Layered engine configuration: environment variables override built-in
//! defaults, following the original `Config.defaults` + env-`apply()`
//! pattern, built on the teacher's pluggable `ConfigProvider` stack.
//!
//! ```rust,no_run
//! use story_engine::config::EngineConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::load().await?;
//! let dsn = config.sentry_dsn().await?;
//! # Ok(())
//! # }
//! ```

pub mod composite;
pub mod env;
pub mod memory;
pub mod provider;

pub use composite::CompositeConfigProvider;
pub use env::EnvConfigProvider;
pub use memory::MemoryConfigProvider;
pub use provider::{ConfigProvider, ConfigProviderExt};

use std::collections::HashMap;

use thiserror::Error;

/// Errors that can occur while reading or writing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("environment error: {0}")]
    Env(#[from] std::env::VarError),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Fluent builder for a layered `CompositeConfigProvider`, mirroring the
/// teacher's `ConfigBuilder`.
pub struct ConfigBuilder {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        ConfigBuilder { providers: Vec::new() }
    }

    pub fn env(mut self) -> Self {
        self.providers.push(Box::new(EnvConfigProvider::new()));
        self
    }

    pub fn memory(mut self, provider: MemoryConfigProvider) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn provider(mut self, provider: Box<dyn ConfigProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn build(self) -> CompositeConfigProvider {
        let mut composite = CompositeConfigProvider::new();
        for provider in self.providers {
            composite.add_provider(provider);
        }
        composite
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        ConfigBuilder::new()
    }
}

fn defaults() -> MemoryConfigProvider {
    let mut data = HashMap::new();
    data.insert("user_reporting".to_string(), "false".to_string());
    data.insert("user_reporting_stacktrace".to_string(), "false".to_string());
    MemoryConfigProvider::from_data(data)
}

/// Typed access to the handful of settings the reporter subsystem needs:
/// the Sentry DSN, the account-wide Slack webhook, CleverTap credentials,
/// and the two user-reporting toggles. Everything else a deployment wants
/// to configure is out of this engine's scope.
pub struct EngineConfig {
    provider: CompositeConfigProvider,
}

impl EngineConfig {
    /// Environment variables over built-in defaults, matching the original
    /// `Config.apply()` precedence.
    pub async fn load() -> ConfigResult<Self> {
        let provider = ConfigBuilder::new().env().memory(defaults()).build();
        Ok(EngineConfig { provider })
    }

    /// Build directly from a caller-supplied provider, for tests and for
    /// embedding this engine with its own configuration source.
    pub fn from_provider(provider: CompositeConfigProvider) -> Self {
        EngineConfig { provider }
    }

    pub async fn sentry_dsn(&self) -> ConfigResult<Option<String>> {
        self.provider.get_raw("sentry.dsn").await
    }

    pub async fn slack_webhook(&self) -> ConfigResult<Option<String>> {
        self.provider.get_raw("slack.webhook").await
    }

    pub async fn clevertap_account(&self) -> ConfigResult<Option<String>> {
        self.provider.get_raw("clevertap.account").await
    }

    pub async fn clevertap_pass(&self) -> ConfigResult<Option<String>> {
        self.provider.get_raw("clevertap.pass").await
    }

    pub async fn user_reporting(&self) -> ConfigResult<bool> {
        self.bool_setting("user_reporting", false).await
    }

    pub async fn user_reporting_stacktrace(&self) -> ConfigResult<bool> {
        self.bool_setting("user_reporting_stacktrace", false).await
    }

    async fn bool_setting(&self, key: &str, default: bool) -> ConfigResult<bool> {
        match self.provider.get_raw(key).await? {
            Some(raw) => Ok(raw.eq_ignore_ascii_case("true") || raw == "1"),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn env_value_overrides_the_built_in_default() {
        std::env::set_var("USER_REPORTING", "true");
        let config = EngineConfig::load().await.unwrap();
        let value = config.user_reporting().await.unwrap();
        std::env::remove_var("USER_REPORTING");
        assert!(value);
    }

    #[tokio::test]
    async fn missing_env_falls_back_to_the_built_in_default() {
        let config = EngineConfig::load().await.unwrap();
        assert!(!config.user_reporting().await.unwrap());
    }

    #[tokio::test]
    async fn unset_optional_fields_resolve_to_none() {
        let provider = ConfigBuilder::new().memory(MemoryConfigProvider::new()).build();
        let config = EngineConfig::from_provider(provider);
        assert_eq!(config.sentry_dsn().await.unwrap(), None);
        assert_eq!(config.clevertap_account().await.unwrap(), None);
    }
}
