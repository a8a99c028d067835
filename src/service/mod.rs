//! The service bridge: `execute`, `start_container`, `when` against a
//! `ServiceBackend` capability. Every call is timed and the elapsed
//! seconds are emitted to the metrics sink.

mod mock;

pub use mock::MockServiceBackend;

use std::time::Instant;

use async_trait::async_trait;

use crate::error::Result;
use crate::observability::MetricsRegistry;
use crate::story::{Line, Story};
use crate::value::{StreamingService, Value};

/// Attribution context passed to the backend for error messages and logs.
#[derive(Debug, Clone)]
pub struct ServiceCallContext {
    pub app_id: String,
    pub story_name: String,
    pub line: String,
}

/// Opaque handle to a live `when` subscription, used to unsubscribe on
/// story teardown.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub String);

/// The out-of-scope collaborator that actually starts containers, runs
/// commands against them, and dispatches streaming events. Its internal
/// design (wire protocol, orchestration) is not specified here — this is
/// only the shape the engine depends on.
#[async_trait]
pub trait ServiceBackend: Send + Sync {
    async fn execute(
        &self,
        service: &str,
        command: &str,
        args: Vec<Value>,
        ctx: &ServiceCallContext,
    ) -> Result<Value>;

    async fn start_container(
        &self,
        service: &str,
        command: &str,
        args: Vec<Value>,
        ctx: &ServiceCallContext,
    ) -> Result<StreamingService>;

    async fn when(
        &self,
        streaming: &StreamingService,
        event: &str,
        ctx: &ServiceCallContext,
    ) -> Result<SubscriptionId>;

    async fn unsubscribe(&self, subscription: &SubscriptionId) -> Result<()>;
}

/// Wraps a `ServiceBackend` with argument resolution and timing, per
/// spec.md §4.3. This is what the Lexicon's `execute`/`start_container`/
/// `when` handlers actually call.
pub struct ServiceBridge {
    backend: std::sync::Arc<dyn ServiceBackend>,
    metrics: std::sync::Arc<MetricsRegistry>,
}

impl ServiceBridge {
    pub fn new(backend: std::sync::Arc<dyn ServiceBackend>, metrics: std::sync::Arc<MetricsRegistry>) -> Self {
        ServiceBridge { backend, metrics }
    }

    fn call_context(story: &Story, line: &Line) -> ServiceCallContext {
        ServiceCallContext {
            app_id: story.app.app_id.clone(),
            story_name: story.name.clone(),
            line: line.ln.to_string(),
        }
    }

    fn resolve_args(story: &Story, line: &Line) -> Result<Vec<Value>> {
        line.args.iter().map(|a| story.resolve(a, true)).collect()
    }

    pub async fn execute(&self, story: &Story, line: &Line) -> Result<Value> {
        let service = line.service.clone().unwrap_or_default();
        let command = line.command.clone().unwrap_or_default();
        let args = Self::resolve_args(story, line)?;
        let ctx = Self::call_context(story, line);

        let start = Instant::now();
        let result = self.backend.execute(&service, &command, args, &ctx).await;
        self.metrics
            .container_exec_seconds_total
            .observe(&story.app.app_id, &story.name, &service, start.elapsed().as_secs_f64());
        result
    }

    pub async fn start_container(&self, story: &Story, line: &Line) -> Result<StreamingService> {
        let service = line.service.clone().unwrap_or_default();
        let command = line.command.clone().unwrap_or_default();
        let args = Self::resolve_args(story, line)?;
        let ctx = Self::call_context(story, line);

        let start = Instant::now();
        let result = self.backend.start_container(&service, &command, args, &ctx).await;
        self.metrics
            .container_start_seconds_total
            .observe(&story.app.app_id, &story.name, &service, start.elapsed().as_secs_f64());
        result
    }

    pub async fn when(
        &self,
        streaming: &StreamingService,
        story: &Story,
        line: &Line,
    ) -> Result<SubscriptionId> {
        let ctx = Self::call_context(story, line);
        let event = line.command.clone().unwrap_or_default();
        self.backend.when(streaming, &event, &ctx).await
    }

    pub async fn unsubscribe(&self, subscription: &SubscriptionId) -> Result<()> {
        self.backend.unsubscribe(subscription).await
    }
}
