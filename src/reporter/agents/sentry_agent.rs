//! Sentry delivery, grounded on `SentryAgent.py`. Only exceptions are
//! forwarded — events and messages are explicitly no-ops there too, since
//! Sentry's role in this system is crash reporting, not a generic event
//! sink.

use std::borrow::Cow;

use async_trait::async_trait;
use sentry::protocol::{Event, Level};

use crate::error::EngineError;
use crate::reporter::{format_tb_error, AgentConfig, AgentResult, EvtData, ExcData, ReportingAgent};

pub struct SentryAgent {
    client: Option<sentry::Client>,
    release: String,
}

impl SentryAgent {
    pub fn new(dsn: Option<String>, release: impl Into<String>) -> Self {
        let release = release.into();
        let client = dsn.and_then(|dsn| {
            let options = sentry::ClientOptions {
                dsn: dsn.parse().ok(),
                release: Some(Cow::Owned(release.clone())),
                attach_stacktrace: false,
                ..Default::default()
            };
            options.dsn.as_ref()?;
            Some(sentry::Client::from(options))
        });
        SentryAgent { client, release }
    }
}

#[async_trait]
impl ReportingAgent for SentryAgent {
    async fn publish_msg(&self, _message: &str, _agent_config: Option<&AgentConfig>) -> AgentResult<()> {
        Ok(())
    }

    async fn publish_evt(&self, _evt_name: &str, _evt_data: &EvtData, _agent_config: Option<&AgentConfig>) -> AgentResult<()> {
        Ok(())
    }

    async fn publish_exc(&self, exc: &EngineError, exc_data: &ExcData, agent_config: Option<&AgentConfig>) -> AgentResult<()> {
        let Some(client) = &self.client else { return Ok(()) };

        let mut full_stacktrace = true;
        let mut suppress_stacktrace = false;
        if let Some(config) = agent_config {
            if let Some(serde_json::Value::Bool(false)) = config.get("full_stacktrace") {
                full_stacktrace = false;
            }
            if let Some(serde_json::Value::Bool(true)) = config.get("suppress_stacktrace") {
                suppress_stacktrace = true;
            }
        }

        let err_str = format_tb_error(exc, full_stacktrace, suppress_stacktrace);

        let mut tags = sentry::protocol::Map::new();
        if let Some(app_uuid) = &exc_data.app_uuid {
            tags.insert("app_uuid".into(), app_uuid.clone());
        }
        if let Some(app_name) = &exc_data.app_name {
            tags.insert("app_name".into(), app_name.clone());
        }
        if let Some(app_version) = &exc_data.app_version {
            tags.insert("app_version".into(), app_version.clone());
        }
        if let Some(story_name) = &exc_data.story_name {
            tags.insert("story_name".into(), story_name.clone());
        }
        if let Some(story_line) = &exc_data.story_line {
            tags.insert("story_line".into(), story_line.clone());
        }

        let event = Event {
            message: Some(err_str),
            level: Level::Error,
            release: Some(Cow::Owned(self.release.clone())),
            tags,
            ..Default::default()
        };

        client.capture_event(event, None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn agent_without_dsn_is_a_no_op() {
        let agent = SentryAgent::new(None, "1.0.0");
        let result = agent.publish_exc(&EngineError::runtime("boom"), &ExcData::default(), None).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn publish_evt_and_publish_msg_are_always_no_ops() {
        let agent = SentryAgent::new(Some("https://public@sentry.example.com/1".into()), "1.0.0");
        assert!(agent.publish_msg("hello", None).await.is_ok());
        assert!(agent.publish_evt("evt", &EvtData::default(), None).await.is_ok());
    }
}
