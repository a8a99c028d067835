//! Environment variable configuration provider, grounded on the teacher's
//! `config::env::EnvConfigProvider` and on the original `Config.apply()`,
//! which likewise overrides each default from `os.getenv()` when present.

use super::provider::ConfigProvider;
use super::{ConfigError, ConfigResult};

/// Reads configuration from environment variables, uppercasing the key and
/// replacing `.` with `_` (`sentry.dsn` -> `SENTRY_DSN`).
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    prefix: Option<String>,
}

impl EnvConfigProvider {
    pub fn new() -> Self {
        EnvConfigProvider { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        EnvConfigProvider { prefix: Some(prefix.into()) }
    }

    fn env_key(&self, key: &str) -> String {
        let key = key.to_uppercase().replace('.', "_");
        match &self.prefix {
            Some(prefix) => format!("{prefix}{key}"),
            None => key,
        }
    }
}

#[async_trait::async_trait]
impl ConfigProvider for EnvConfigProvider {
    fn name(&self) -> &str {
        "env"
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        match std::env::var(self.env_key(key)) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(ConfigError::Env(e)),
        }
    }

    async fn set_raw(&self, key: &str, value: &str) -> ConfigResult<()> {
        std::env::set_var(self.env_key(key), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn env_key_uses_uppercase_with_underscores() {
        let provider = EnvConfigProvider::new();
        assert_eq!(provider.env_key("sentry.dsn"), "SENTRY_DSN");
    }

    #[tokio::test]
    async fn reads_value_set_in_the_process_environment() {
        let provider = EnvConfigProvider::with_prefix("CONFIG_ENV_TEST_");
        std::env::set_var("CONFIG_ENV_TEST_SLACK_WEBHOOK", "https://hooks.example.com/env");
        let value = provider.get_raw("slack.webhook").await.unwrap();
        std::env::remove_var("CONFIG_ENV_TEST_SLACK_WEBHOOK");
        assert_eq!(value, Some("https://hooks.example.com/env".to_string()));
    }

    #[tokio::test]
    async fn missing_variable_reads_as_none() {
        let provider = EnvConfigProvider::with_prefix("CONFIG_ENV_TEST_MISSING_");
        assert_eq!(provider.get_raw("anything").await.unwrap(), None);
    }
}
