//! Slack webhook delivery, grounded on `SlackAgent.py`. The only agent
//! that supports per-call webhook overrides, since it's the only one user
//! apps are allowed to route their own events to.

use async_trait::async_trait;

use crate::error::EngineError;
use crate::reporter::{fetch_with_retry, format_tb_error, AgentConfig, AgentResult, EvtData, ExcData, ReportingAgent};

pub struct SlackAgent {
    webhook: Option<String>,
    release: String,
    client: reqwest::Client,
}

impl SlackAgent {
    pub fn new(webhook: Option<String>, release: impl Into<String>) -> Self {
        SlackAgent { webhook, release: release.into(), client: crate::reporter::default_http_client() }
    }

    fn resolve_webhook(&self, agent_config: Option<&AgentConfig>) -> Option<String> {
        if let Some(config) = agent_config {
            if let Some(serde_json::Value::String(webhook)) = config.get("webhook") {
                return Some(webhook.clone());
            }
        }
        self.webhook.clone()
    }

    async fn post(&self, webhook: &str, text: String) -> AgentResult<()> {
        let body = serde_json::json!({ "text": text });
        fetch_with_retry(
            &self.client,
            webhook,
            vec![("Content-Type", "application/json".to_string())],
            body,
            3,
        )
        .await
    }
}

fn labelled(label: &str, value: &Option<String>) -> String {
    match value {
        Some(v) => format!("*{label}*: {v}\n"),
        None => String::new(),
    }
}

#[async_trait]
impl ReportingAgent for SlackAgent {
    async fn publish_msg(&self, message: &str, agent_config: Option<&AgentConfig>) -> AgentResult<()> {
        let Some(webhook) = self.resolve_webhook(agent_config) else { return Ok(()) };
        self.post(&webhook, message.to_string()).await
    }

    async fn publish_evt(&self, evt_name: &str, evt_data: &EvtData, agent_config: Option<&AgentConfig>) -> AgentResult<()> {
        let Some(webhook) = self.resolve_webhook(agent_config) else { return Ok(()) };

        let evt_str = if evt_data.event_data.is_null() {
            String::new()
        } else {
            format!("\n\n```{}```", evt_data.event_data)
        };

        let err_msg = format!(
            "An event was triggered with the following information:\n\n\
             *Platform Engine Release*: {}\n{}{}{}{}{}*Event*: {evt_name}{evt_str}",
            self.release,
            labelled("App Name", &evt_data.app_name),
            labelled("App UUID", &evt_data.app_uuid),
            labelled("App Version", &evt_data.app_version),
            labelled("Story Name", &evt_data.story_name),
            labelled("Story Line Number", &evt_data.story_line),
        );

        self.post(&webhook, err_msg).await
    }

    async fn publish_exc(&self, exc: &EngineError, exc_data: &ExcData, agent_config: Option<&AgentConfig>) -> AgentResult<()> {
        let Some(webhook) = self.resolve_webhook(agent_config) else { return Ok(()) };

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
        let traceback_line = if suppress_stacktrace {
            format!("*Error*: {err_str}")
        } else {
            format!("```{err_str}```")
        };

        let err_msg = format!(
            "An exception occurred with the following information:\n\n\
             *Platform Engine Release*: {}\n{}{}{}{}{}{traceback_line}",
            self.release,
            labelled("App Name", &exc_data.app_name),
            labelled("App UUID", &exc_data.app_uuid),
            labelled("App Version", &exc_data.app_version),
            labelled("Story Name", &exc_data.story_name),
            labelled("Story Line Number", &exc_data.story_line),
        );

        self.post(&webhook, err_msg).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_webhook_prefers_agent_config_override() {
        let agent = SlackAgent::new(Some("https://default".into()), "1.0.0");
        let mut config = AgentConfig::new();
        config.insert("webhook".into(), serde_json::Value::String("https://override".into()));
        assert_eq!(agent.resolve_webhook(Some(&config)), Some("https://override".into()));
    }

    #[test]
    fn resolve_webhook_falls_back_to_default() {
        let agent = SlackAgent::new(Some("https://default".into()), "1.0.0");
        assert_eq!(agent.resolve_webhook(None), Some("https://default".into()));
    }

    #[test]
    fn no_webhook_at_all_resolves_to_none() {
        let agent = SlackAgent::new(None, "1.0.0");
        assert_eq!(agent.resolve_webhook(None), None);
    }
}
