//! CleverTap delivery, grounded on `CleverTapAgent.py`. Both events and
//! exceptions only go out when the caller's `agent_config` supplies a
//! CleverTap identity and event name — there is no account-wide default
//! event to publish to, unlike Slack/Sentry.

use async_trait::async_trait;

use crate::error::EngineError;
use crate::reporter::{fetch_with_retry, format_tb_error, AgentConfig, AgentResult, EvtData, ExcData, ReportingAgent};

const UPLOAD_URL: &str = "https://api.clevertap.com/1/upload";

pub struct CleverTapAgent {
    account_id: String,
    account_pass: String,
    client: reqwest::Client,
}

impl CleverTapAgent {
    pub fn new(account_id: impl Into<String>, account_pass: impl Into<String>) -> Self {
        CleverTapAgent {
            account_id: account_id.into(),
            account_pass: account_pass.into(),
            client: crate::reporter::default_http_client(),
        }
    }

    fn identity_and_event(agent_config: Option<&AgentConfig>) -> Option<(String, String)> {
        let config = agent_config?;
        let identity = config.get("clever_ident")?.as_str()?.to_string();
        let event = config.get("clever_event")?.as_str()?.to_string();
        Some((identity, event))
    }

    async fn upload(&self, identity: String, evt_name: String, evt_data: serde_json::Map<String, serde_json::Value>) -> AgentResult<()> {
        let event = serde_json::json!({
            "ts": unix_now(),
            "identity": identity,
            "evtName": evt_name,
            "evtData": evt_data,
            "type": "event",
        });
        let body = serde_json::json!({ "d": [event] });

        fetch_with_retry(
            &self.client,
            UPLOAD_URL,
            vec![
                ("X-CleverTap-Account-Id", self.account_id.clone()),
                ("X-CleverTap-Passcode", self.account_pass.clone()),
                ("Content-Type", "application/json; charset=utf-8".to_string()),
            ],
            body,
            3,
        )
        .await
    }
}

/// The reporter layer cannot call `Utc::now()`/`SystemTime::now()` from
/// anywhere that must stay deterministic for tests, but CleverTap's wire
/// format requires a unix-seconds timestamp per event — this is the one
/// place in the crate that reads real wall-clock time.
fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[async_trait]
impl ReportingAgent for CleverTapAgent {
    async fn publish_msg(&self, _message: &str, _agent_config: Option<&AgentConfig>) -> AgentResult<()> {
        Ok(())
    }

    async fn publish_evt(&self, _evt_name: &str, evt_data: &EvtData, agent_config: Option<&AgentConfig>) -> AgentResult<()> {
        let Some((identity, event_name)) = Self::identity_and_event(agent_config) else { return Ok(()) };

        let mut data = serde_json::Map::new();
        if let Some(app_name) = &evt_data.app_name {
            data.insert("App name".into(), serde_json::Value::String(app_name.clone()));
        }
        if let Some(app_version) = &evt_data.app_version {
            data.insert("App version".into(), serde_json::Value::String(app_version.clone()));
        }
        if let Some(story_name) = &evt_data.story_name {
            data.insert("Story name".into(), serde_json::Value::String(story_name.clone()));
        }
        if let Some(story_line) = &evt_data.story_line {
            data.insert("Story line".into(), serde_json::Value::String(story_line.clone()));
        }

        self.upload(identity, event_name, data).await
    }

    async fn publish_exc(&self, exc: &EngineError, exc_data: &ExcData, agent_config: Option<&AgentConfig>) -> AgentResult<()> {
        let Some((identity, event_name)) = Self::identity_and_event(agent_config) else { return Ok(()) };

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

        let mut data = serde_json::Map::new();
        data.insert("Stacktrace".into(), serde_json::Value::String(err_str));
        if let Some(app_name) = &exc_data.app_name {
            data.insert("App name".into(), serde_json::Value::String(app_name.clone()));
        }
        if let Some(app_version) = &exc_data.app_version {
            data.insert("App version".into(), serde_json::Value::String(app_version.clone()));
        }
        if let Some(story_name) = &exc_data.story_name {
            data.insert("Story name".into(), serde_json::Value::String(story_name.clone()));
        }
        if let Some(story_line) = &exc_data.story_line {
            data.insert("Story line".into(), serde_json::Value::String(story_line.clone()));
        }

        self.upload(identity, event_name, data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_clever_ident_or_event_skips_delivery() {
        let mut config = AgentConfig::new();
        config.insert("clever_ident".into(), serde_json::Value::String("user-1".into()));
        assert!(CleverTapAgent::identity_and_event(Some(&config)).is_none());
    }

    #[test]
    fn both_fields_present_resolves_identity_and_event() {
        let mut config = AgentConfig::new();
        config.insert("clever_ident".into(), serde_json::Value::String("user-1".into()));
        config.insert("clever_event".into(), serde_json::Value::String("story_failed".into()));
        assert_eq!(
            CleverTapAgent::identity_and_event(Some(&config)),
            Some(("user-1".into(), "story_failed".into()))
        );
    }
}
