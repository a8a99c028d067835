//! Multi-agent error/event/message reporting: fan out to Slack, Sentry,
//! and CleverTap without letting a failing agent affect story execution.
//!
//! Grounded on `Reporter.py`/`ReportingAgent.py`/the `agents/*.py` trio.
//! `capture_exc`/`capture_evt`/`capture_msg` spawn a detached task per call
//! (mirroring `asyncio.get_event_loop().create_task`) and swallow
//! per-agent errors by logging them rather than propagating.

mod agents;
mod backoff;

pub use agents::{CleverTapAgent, SentryAgent, SlackAgent};
pub use backoff::ExponentialBackoff;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::EngineError;

/// Error type for agent publish operations: these are logged and
/// swallowed by the reporter, never propagated into story execution, so
/// a boxed trait object is enough — no caller ever matches on its kind.
pub type AgentResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Free-form per-agent override, e.g. a user's own Slack webhook or
/// CleverTap identity/event names. Mirrors the Python `agent_config: dict`.
pub type AgentConfig = HashMap<String, serde_json::Value>;

/// Attribution carried alongside a captured exception/event, mirroring
/// `ReportingAgentOptions`.
#[derive(Debug, Clone)]
pub struct ReportingAgentOptions {
    pub story_name: Option<String>,
    pub story_line: Option<String>,
    pub app_name: Option<String>,
    pub app_uuid: Option<String>,
    pub app_version: Option<String>,
    pub agent_config: Option<AgentConfig>,
    pub allow_user_events: bool,
    pub suppress_agents: Vec<String>,
}

/// `allow_user_events` defaults to `true` (spec.md §4.5): a report reaches a
/// per-app override unless the caller opts out explicitly.
impl Default for ReportingAgentOptions {
    fn default() -> Self {
        ReportingAgentOptions {
            story_name: None,
            story_line: None,
            app_name: None,
            app_uuid: None,
            app_version: None,
            agent_config: None,
            allow_user_events: true,
            suppress_agents: Vec::new(),
        }
    }
}

/// Attribution attached to an outbound exception report.
#[derive(Debug, Clone, Default)]
pub struct ExcData {
    pub platform_release: String,
    pub story_name: Option<String>,
    pub story_line: Option<String>,
    pub app_name: Option<String>,
    pub app_uuid: Option<String>,
    pub app_version: Option<String>,
}

/// Attribution attached to an outbound event report.
#[derive(Debug, Clone, Default)]
pub struct EvtData {
    pub platform_release: String,
    pub story_name: Option<String>,
    pub story_line: Option<String>,
    pub app_name: Option<String>,
    pub app_uuid: Option<String>,
    pub app_version: Option<String>,
    pub event_data: serde_json::Value,
}

/// A reporting destination. Every method is best-effort: a failing agent
/// logs and does not propagate, so one bad webhook never blocks another
/// agent's delivery.
#[async_trait]
pub trait ReportingAgent: Send + Sync {
    async fn publish_exc(&self, exc: &EngineError, exc_data: &ExcData, agent_config: Option<&AgentConfig>) -> AgentResult<()>;
    async fn publish_evt(&self, evt_name: &str, evt_data: &EvtData, agent_config: Option<&AgentConfig>) -> AgentResult<()>;
    async fn publish_msg(&self, message: &str, agent_config: Option<&AgentConfig>) -> AgentResult<()>;
}

/// Formats an error for agent delivery. Since the engine has no Python-style
/// traceback object, "full stacktrace" here means including the `root`
/// cause chain; "suppress" means the bare top-level message only.
pub fn format_tb_error(error: &EngineError, full_stacktrace: bool, suppress_stacktrace: bool) -> String {
    if suppress_stacktrace {
        return match error.root() {
            Some(root) => format!("{error}: {root}"),
            None => error.to_string(),
        };
    }

    let err_str = error.to_string();
    if full_stacktrace {
        if let Some(root) = error.root() {
            return format!("{err_str}\n\nCaused by:\n{root}");
        }
    }
    err_str
}

struct RegisteredAgent {
    name: &'static str,
    agent: Arc<dyn ReportingAgent>,
    exceptions: bool,
    events: bool,
    messages: bool,
}

/// App-scoped reporting overrides: a per-app Slack webhook a user opted
/// into for their own app's execution events.
#[derive(Debug, Clone, Default)]
pub struct AppAgentConfig {
    pub slack_webhook: Option<String>,
}

/// Top-level reporter config (see `src/config`): whether user-facing
/// reporting is enabled at all, and whether it includes stacktraces by
/// default.
#[derive(Debug, Clone, Default)]
pub struct ReporterSettings {
    pub user_reporting: bool,
    pub user_reporting_stacktrace: bool,
}

/// Registers agents, fans out captures to all of them, and separately fans
/// out to a per-app Slack override when user reporting is enabled.
///
/// Unlike the Python original's classmethod-on-a-singleton design, this is
/// an owned, cloneable (`Arc`-internally) value so multiple stories can
/// share one instance without a process-global.
pub struct Reporter {
    release: String,
    settings: ReporterSettings,
    agents: HashMap<&'static str, RegisteredAgent>,
    app_agents: DashMap<String, AppAgentConfig>,
}

impl Reporter {
    pub fn new(release: impl Into<String>, settings: ReporterSettings) -> Self {
        Reporter {
            release: release.into(),
            settings,
            agents: HashMap::new(),
            app_agents: DashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        id: &'static str,
        agent: Arc<dyn ReportingAgent>,
        exceptions: bool,
        events: bool,
        messages: bool,
    ) {
        self.agents.insert(id, RegisteredAgent { name: id, agent, exceptions, events, messages });
    }

    pub fn init_app_agents(&self, app_uuid: impl Into<String>, config: AppAgentConfig) {
        self.app_agents.insert(app_uuid.into(), config);
    }

    pub fn app_agents(&self, app_uuid: &str) -> Option<AppAgentConfig> {
        self.app_agents.get(app_uuid).map(|entry| entry.value().clone())
    }

    pub fn agent_ids(&self) -> Vec<&'static str> {
        self.agents.keys().copied().collect()
    }

    /// Fire-and-forget exception capture: spawns a task that fans out to
    /// every registered agent, then (if user reporting is on and the
    /// caller allowed it) to the app's own Slack override.
    pub fn capture_exc(self: &Arc<Self>, error: EngineError, options: ReportingAgentOptions) {
        let reporter = Arc::clone(self);
        tokio::spawn(async move {
            reporter.capture_exc_inner(error, options).await;
        });
    }

    async fn capture_exc_inner(&self, error: EngineError, options: ReportingAgentOptions) {
        if self.agents.is_empty() {
            return;
        }

        let exc_data = ExcData {
            platform_release: self.release.clone(),
            story_name: options.story_name.clone(),
            story_line: options.story_line.clone(),
            app_name: options.app_name.clone(),
            app_uuid: options.app_uuid.clone(),
            app_version: options.app_version.clone(),
        };

        for registered in self.agents.values() {
            if !registered.exceptions || options.suppress_agents.iter().any(|s| s == registered.name) {
                continue;
            }
            if let Err(e) = registered
                .agent
                .publish_exc(&error, &exc_data, options.agent_config.as_ref())
                .await
            {
                tracing::error!(agent = registered.name, error = %e, "unhandled reporting agent error");
            }
        }

        self.report_to_app_slack_for_exc(&error, &exc_data, &options).await;
    }

    async fn report_to_app_slack_for_exc(&self, error: &EngineError, exc_data: &ExcData, options: &ReportingAgentOptions) {
        if !self.settings.user_reporting || !options.allow_user_events {
            return;
        }
        let Some(app_uuid) = &options.app_uuid else { return };
        let Some(app_config) = self.app_agents(app_uuid) else { return };
        let Some(webhook) = app_config.slack_webhook else { return };
        let Some(registered) = self.agents.get("slack") else { return };

        let mut user_config = AgentConfig::new();
        user_config.insert("webhook".into(), serde_json::Value::String(webhook));
        if !self.settings.user_reporting_stacktrace {
            user_config.insert("full_stacktrace".into(), serde_json::Value::Bool(false));
            user_config.insert("suppress_stacktrace".into(), serde_json::Value::Bool(true));
        } else {
            user_config.insert("full_stacktrace".into(), serde_json::Value::Bool(true));
        }

        if let Err(e) = registered.agent.publish_exc(error, exc_data, Some(&user_config)).await {
            tracing::error!(error = %e, "unhandled app reporting agent error");
        }
    }

    pub fn capture_evt(self: &Arc<Self>, evt_name: impl Into<String>, evt_data: serde_json::Value, options: ReportingAgentOptions) {
        let reporter = Arc::clone(self);
        let evt_name = evt_name.into();
        tokio::spawn(async move {
            reporter.capture_evt_inner(evt_name, evt_data, options).await;
        });
    }

    async fn capture_evt_inner(&self, evt_name: String, evt_data: serde_json::Value, options: ReportingAgentOptions) {
        if self.agents.is_empty() {
            return;
        }

        let data = EvtData {
            platform_release: self.release.clone(),
            story_name: options.story_name.clone(),
            story_line: options.story_line.clone(),
            app_name: options.app_name.clone(),
            app_uuid: options.app_uuid.clone(),
            app_version: options.app_version.clone(),
            event_data: evt_data,
        };

        for registered in self.agents.values() {
            if !registered.events || options.suppress_agents.iter().any(|s| s == registered.name) {
                continue;
            }
            if let Err(e) = registered
                .agent
                .publish_evt(&evt_name, &data, options.agent_config.as_ref())
                .await
            {
                tracing::error!(agent = registered.name, error = %e, "unhandled reporting agent error");
            }
        }

        if !self.settings.user_reporting || !options.allow_user_events {
            return;
        }
        let Some(app_uuid) = &options.app_uuid else { return };
        let Some(app_config) = self.app_agents(app_uuid) else { return };
        let Some(webhook) = app_config.slack_webhook else { return };
        let Some(registered) = self.agents.get("slack") else { return };

        let mut user_config = AgentConfig::new();
        user_config.insert("webhook".into(), serde_json::Value::String(webhook));
        if let Err(e) = registered.agent.publish_evt(&evt_name, &data, Some(&user_config)).await {
            tracing::error!(error = %e, "unhandled app reporting agent error");
        }
    }

    pub fn capture_msg(self: &Arc<Self>, message: impl Into<String>, options: ReportingAgentOptions) {
        let reporter = Arc::clone(self);
        let message = message.into();
        tokio::spawn(async move {
            reporter.capture_msg_inner(message, options).await;
        });
    }

    async fn capture_msg_inner(&self, message: String, options: ReportingAgentOptions) {
        if self.agents.is_empty() {
            return;
        }
        for registered in self.agents.values() {
            if !registered.messages || options.suppress_agents.iter().any(|s| s == registered.name) {
                continue;
            }
            if let Err(e) = registered.agent.publish_msg(&message, options.agent_config.as_ref()).await {
                tracing::error!(agent = registered.name, error = %e, "unhandled reporting agent error");
            }
        }
    }
}

pub(crate) fn default_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("reqwest client builder should not fail with default TLS config")
}

/// Retries a POST up to `tries` times with exponential backoff, per
/// `HttpUtils.fetch_with_retry`. Only retries on transport/5xx failures;
/// a successful response (even 4xx) returns immediately.
pub(crate) async fn fetch_with_retry(
    client: &reqwest::Client,
    url: &str,
    headers: Vec<(&'static str, String)>,
    body: serde_json::Value,
    tries: u32,
) -> AgentResult<()> {
    let backoff = ExponentialBackoff::default();
    let mut attempt = 0;
    loop {
        attempt += 1;
        let mut request = client.post(url).json(&body);
        for (name, value) in &headers {
            request = request.header(*name, value);
        }

        match request.send().await {
            Ok(response) if response.status().is_server_error() && attempt < tries => {
                tracing::warn!(url, attempt, status = %response.status(), "reporting agent delivery failed, retrying");
            }
            Ok(response) => {
                return response.error_for_status().map(|_| ()).map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>);
            }
            Err(e) if attempt < tries => {
                tracing::warn!(url, attempt, error = %e, "reporting agent delivery failed, retrying");
            }
            Err(e) => return Err(Box::new(e)),
        }

        tokio::time::sleep(backoff.delay_for(attempt)).await;
    }
}
