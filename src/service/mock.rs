//! A deterministic `ServiceBackend` double for engine tests. Outcomes are
//! stubbed per `(service, command)` and every call is recorded so tests can
//! assert on what the bridge actually sent.

use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{EngineError, Result};
use crate::value::{StreamingService, Value};

use super::{ServiceBackend, ServiceCallContext, SubscriptionId};

type Key = (String, String);

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub service: String,
    pub command: String,
    pub args: Vec<Value>,
}

/// Stubs `execute`/`start_container` outcomes by `(service, command)` and
/// records every call made through it.
#[derive(Default)]
pub struct MockServiceBackend {
    execute_stubs: DashMap<Key, Result<Value>>,
    start_container_stubs: DashMap<Key, Result<StreamingService>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockServiceBackend {
    pub fn new() -> Self {
        MockServiceBackend::default()
    }

    pub fn stub_execute(&self, service: &str, command: &str, outcome: Result<Value>) {
        self.execute_stubs.insert((service.to_string(), command.to_string()), outcome);
    }

    pub fn stub_start_container(&self, service: &str, command: &str, outcome: Result<StreamingService>) {
        self.start_container_stubs
            .insert((service.to_string(), command.to_string()), outcome);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("mock call log poisoned").clone()
    }
}

#[async_trait]
impl ServiceBackend for MockServiceBackend {
    async fn execute(
        &self,
        service: &str,
        command: &str,
        args: Vec<Value>,
        ctx: &ServiceCallContext,
    ) -> Result<Value> {
        self.calls.lock().expect("mock call log poisoned").push(RecordedCall {
            service: service.to_string(),
            command: command.to_string(),
            args,
        });
        self.execute_stubs
            .get(&(service.to_string(), command.to_string()))
            .map(|entry| clone_result(entry.value()))
            .unwrap_or_else(|| {
                Err(EngineError::ActionNotFound {
                    service: service.to_string(),
                    action: command.to_string(),
                    story: Some(crate::error::StoryRef {
                        app_id: ctx.app_id.clone(),
                        story_name: ctx.story_name.clone(),
                    }),
                    line: Some(crate::story::LineId(ctx.line.clone())),
                })
            })
    }

    async fn start_container(
        &self,
        service: &str,
        command: &str,
        args: Vec<Value>,
        _ctx: &ServiceCallContext,
    ) -> Result<StreamingService> {
        self.calls.lock().expect("mock call log poisoned").push(RecordedCall {
            service: service.to_string(),
            command: command.to_string(),
            args,
        });
        self.start_container_stubs
            .get(&(service.to_string(), command.to_string()))
            .map(|entry| clone_streaming_result(entry.value()))
            .unwrap_or_else(|| {
                Ok(StreamingService {
                    name: service.to_string(),
                    command: command.to_string(),
                    container_name: format!("{service}-{command}"),
                    hostname: format!("{service}.local"),
                })
            })
    }

    async fn when(
        &self,
        streaming: &StreamingService,
        event: &str,
        _ctx: &ServiceCallContext,
    ) -> Result<SubscriptionId> {
        Ok(SubscriptionId(format!("{}.{}:{event}", streaming.container_name, streaming.name)))
    }

    async fn unsubscribe(&self, _subscription: &SubscriptionId) -> Result<()> {
        Ok(())
    }
}

fn clone_result(result: &Result<Value>) -> Result<Value> {
    match result {
        Ok(v) => Ok(v.clone()),
        Err(e) => Err(clone_error(e)),
    }
}

fn clone_streaming_result(result: &Result<StreamingService>) -> Result<StreamingService> {
    match result {
        Ok(v) => Ok(v.clone()),
        Err(e) => Err(clone_error(e)),
    }
}

/// `EngineError` is not `Clone` (it boxes a `root` chain); stubbed failures
/// are re-derived as an equivalent `Runtime` error carrying the original
/// message, which is all assertions on stubbed mock failures need.
fn clone_error(error: &EngineError) -> EngineError {
    EngineError::runtime(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unstubbed_execute_reports_action_not_found() {
        let backend = MockServiceBackend::new();
        let ctx = ServiceCallContext {
            app_id: "app".into(),
            story_name: "story".into(),
            line: "1".into(),
        };
        let err = backend.execute("alpine", "echo", vec![], &ctx).await.unwrap_err();
        assert!(matches!(err, EngineError::ActionNotFound { .. }));
    }

    #[tokio::test]
    async fn calls_are_recorded_in_order() {
        let backend = MockServiceBackend::new();
        backend.stub_execute("alpine", "echo", Ok(Value::Null));
        let ctx = ServiceCallContext {
            app_id: "app".into(),
            story_name: "story".into(),
            line: "1".into(),
        };
        backend.execute("alpine", "echo", vec![Value::Integer(1)], &ctx).await.unwrap();
        backend.execute("alpine", "echo", vec![Value::Integer(2)], &ctx).await.unwrap();

        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].args, vec![Value::Integer(1)]);
        assert_eq!(calls[1].args, vec![Value::Integer(2)]);
    }
}
