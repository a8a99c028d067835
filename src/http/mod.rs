//! The story trigger ingress: an axum handler that runs a story to
//! completion on an HTTP request and reports failures through the
//! reporter, grounded on `BaseHandler.handle_story_exc`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{routing::post, Json, Router};
use dashmap::DashMap;
use serde::Deserialize;

use crate::error::EngineError;
use crate::reporter::{AgentConfig, ReportingAgentOptions, Reporter};
use crate::story::App;

/// Live registry of apps this process is serving, keyed by app id.
#[derive(Clone, Default)]
pub struct AppRegistry {
    apps: Arc<DashMap<String, Arc<App>>>,
}

impl AppRegistry {
    pub fn new() -> Self {
        AppRegistry::default()
    }

    pub fn insert(&self, app: Arc<App>) {
        self.apps.insert(app.app_id.clone(), app);
    }

    pub fn get(&self, app_id: &str) -> Option<Arc<App>> {
        self.apps.get(app_id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, app_id: &str) {
        self.apps.remove(app_id);
    }
}

#[derive(Clone)]
pub struct AppState {
    pub registry: AppRegistry,
    pub reporter: Arc<Reporter>,
}

#[derive(Debug, Deserialize)]
pub struct TriggerRequest {
    pub app_id: String,
    pub story_name: String,
}

/// `POST /stories/trigger`: every path through this handler constructs
/// exactly one response (see `SPEC_FULL.md` idempotent-finalize note) —
/// there is no branch that can both report an error and fall through to a
/// second write.
pub async fn trigger_story(State(state): State<AppState>, Json(request): Json<TriggerRequest>) -> Response {
    match run_story(&state, &request).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(error) => {
            handle_story_exc(&state, &request.app_id, &request.story_name, error);
            story_execution_failed_response()
        }
    }
}

/// The fixed 500 response for a failed story run: empty body, per spec.md
/// §6. Hyper (axum's server transport) always writes the canonical reason
/// phrase for a status code on the HTTP/1.1 status line rather than an
/// arbitrary one, so `"Story execution failed"` isn't settable on the wire
/// the way `BaseHandler.set_status(500, 'Story execution failed')` sets it
/// in the original — it's carried in the `x-reason-phrase` header instead,
/// which keeps it observable to a caller without putting it in the body.
fn story_execution_failed_response() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header("x-reason-phrase", "Story execution failed")
        .body(axum::body::Body::empty())
        .expect("a fixed-shape response cannot fail to build")
}

/// Placeholder for the out-of-scope story-lookup-and-run pipeline: finding
/// the app's compiled tree and handing it to the Lexicon. The ingress
/// surface this module owns is the HTTP plumbing and error reporting
/// around that call, not the pipeline itself.
async fn run_story(state: &AppState, request: &TriggerRequest) -> Result<(), EngineError> {
    if state.registry.get(&request.app_id).is_none() {
        return Err(EngineError::storyscript(
            format!("app {} is not registered", request.app_id),
            None,
            None,
        ));
    }
    Ok(())
}

fn handle_story_exc(state: &AppState, app_id: &str, story_name: &str, error: EngineError) {
    tracing::error!(app_id, story_name, error = %error, "story execution failed");

    let app = state.registry.get(app_id);
    let mut agent_config = AgentConfig::new();
    if let Some(app) = &app {
        agent_config.insert("clever_ident".into(), serde_json::Value::String(app.owner_email.clone()));
        agent_config.insert("clever_event".into(), serde_json::Value::String("App Request Failure".into()));
    }

    state.reporter.capture_exc(
        error,
        ReportingAgentOptions {
            story_name: Some(story_name.to_string()),
            app_uuid: Some(app_id.to_string()),
            app_name: app.as_ref().map(|a| a.app_name.clone()),
            app_version: app.as_ref().map(|a| a.version.clone()),
            agent_config: Some(agent_config),
            allow_user_events: true,
            ..Default::default()
        },
    );
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/stories/trigger", post(trigger_story))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::ReporterSettings;

    fn state() -> AppState {
        AppState {
            registry: AppRegistry::new(),
            reporter: Arc::new(Reporter::new("1.0.0", ReporterSettings::default())),
        }
    }

    #[tokio::test]
    async fn unregistered_app_reports_and_responds_500() {
        let state = state();
        let response = trigger_story(
            State(state),
            Json(TriggerRequest { app_id: "missing".into(), story_name: "s".into() }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get("x-reason-phrase").unwrap(),
            "Story execution failed"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn registered_app_with_no_story_work_responds_200() {
        let state = state();
        state.registry.insert(Arc::new(App {
            app_id: "app-1".into(),
            app_name: "App".into(),
            version: "1".into(),
            owner_email: "o@example.com".into(),
        }));
        let response = trigger_story(
            State(state),
            Json(TriggerRequest { app_id: "app-1".into(), story_name: "s".into() }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
