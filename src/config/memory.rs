//! In-memory configuration provider, grounded on the teacher's
//! `config::memory::MemoryConfigProvider`. Used to seed the defaults the
//! original `Config.defaults` dict hard-codes, underneath the env provider.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::provider::ConfigProvider;
use super::ConfigResult;

#[derive(Debug, Default)]
pub struct MemoryConfigProvider {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryConfigProvider {
    pub fn new() -> Self {
        MemoryConfigProvider::default()
    }

    pub fn from_data(data: HashMap<String, String>) -> Self {
        MemoryConfigProvider { data: RwLock::new(data) }
    }
}

#[async_trait::async_trait]
impl ConfigProvider for MemoryConfigProvider {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set_raw(&self, key: &str, value: &str) -> ConfigResult<()> {
        self.data.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_what_was_seeded() {
        let mut seed = HashMap::new();
        seed.insert("user_reporting".to_string(), "false".to_string());
        let provider = MemoryConfigProvider::from_data(seed);
        assert_eq!(provider.get_raw("user_reporting").await.unwrap(), Some("false".to_string()));
    }

    #[tokio::test]
    async fn set_raw_is_visible_to_later_get_raw() {
        let provider = MemoryConfigProvider::new();
        provider.set_raw("sentry.dsn", "https://key@sentry.io/1").await.unwrap();
        assert_eq!(provider.get_raw("sentry.dsn").await.unwrap(), Some("https://key@sentry.io/1".to_string()));
    }
}
