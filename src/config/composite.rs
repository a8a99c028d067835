//! Chains multiple configuration providers with priority ordering, grounded
//! on the teacher's `config::composite::CompositeConfigProvider`. Earlier
//! providers win, mirroring `Config.apply()`'s env-overrides-defaults order.

use super::provider::ConfigProvider;
use super::ConfigResult;

pub struct CompositeConfigProvider {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl CompositeConfigProvider {
    pub fn new() -> Self {
        CompositeConfigProvider { providers: Vec::new() }
    }

    pub fn add_provider(&mut self, provider: Box<dyn ConfigProvider>) {
        self.providers.push(provider);
    }
}

impl Default for CompositeConfigProvider {
    fn default() -> Self {
        CompositeConfigProvider::new()
    }
}

#[async_trait::async_trait]
impl ConfigProvider for CompositeConfigProvider {
    fn name(&self) -> &str {
        "composite"
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        for provider in &self.providers {
            if let Some(value) = provider.get_raw(key).await? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    async fn set_raw(&self, key: &str, value: &str) -> ConfigResult<()> {
        if let Some(provider) = self.providers.first() {
            provider.set_raw(key, value).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::memory::MemoryConfigProvider;

    #[tokio::test]
    async fn first_provider_added_wins_on_conflicting_keys() {
        let high = MemoryConfigProvider::new();
        high.set_raw("key", "high").await.unwrap();
        let low = MemoryConfigProvider::new();
        low.set_raw("key", "low").await.unwrap();
        low.set_raw("only_low", "value").await.unwrap();

        let mut composite = CompositeConfigProvider::new();
        composite.add_provider(Box::new(high));
        composite.add_provider(Box::new(low));

        assert_eq!(composite.get_raw("key").await.unwrap(), Some("high".to_string()));
        assert_eq!(composite.get_raw("only_low").await.unwrap(), Some("value".to_string()));
    }
}
