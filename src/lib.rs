//! # story-engine
//!
//! Execution core for long-lived reactive story workflows: a tree-walking
//! interpreter ("Lexicon") that runs user-authored stories line by line,
//! a pure mutation library for in-story value transforms, a service bridge
//! for calling out to containerized backends, and a multi-agent reporter
//! that fans errors and events out to Sentry, Slack, and CleverTap.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use story_engine::lexicon::execute_block;
//! use story_engine::observability::MetricsRegistry;
//! use story_engine::service::{MockServiceBackend, ServiceBridge};
//! use story_engine::story::{App, Line, LineId, Method, Story};
//!
//! # async fn example() -> story_engine::error::Result<()> {
//! let bridge = ServiceBridge::new(Arc::new(MockServiceBackend::new()), Arc::new(MetricsRegistry::new()));
//! let mut tree = HashMap::new();
//! tree.insert(LineId::from("1"), Line::new("1", Method::Expression));
//! let app = Arc::new(App {
//!     app_id: "app-1".into(),
//!     app_name: "demo".into(),
//!     version: "1".into(),
//!     owner_email: "owner@example.com".into(),
//! });
//! let mut story = Story::new(app, "story-1", tree);
//! let entry = story.line(&LineId::from("1")).unwrap().clone();
//! execute_block(&bridge, &mut story, &entry).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod lexicon;
pub mod mutations;
pub mod observability;
pub mod reporter;
pub mod sentinel;
pub mod service;
pub mod story;
pub mod value;

// Re-exports for convenience
pub use config::{ConfigBuilder, ConfigError, ConfigProvider, ConfigResult, EngineConfig};
pub use error::{EngineError, Result, StoryRef};
pub use http::{trigger_story, AppRegistry, AppState, TriggerRequest};
pub use lexicon::execute_block;
pub use mutations::mutate;
pub use observability::{LabelledHistogram, MetricsRegistry};
pub use reporter::{
    AgentConfig, AgentResult, AppAgentConfig, CleverTapAgent, EvtData, ExcData, ExponentialBackoff, Reporter,
    ReporterSettings, ReportingAgent, ReportingAgentOptions, SentryAgent, SlackAgent,
};
pub use sentinel::{Flow, Sentinel};
pub use service::{MockServiceBackend, ServiceBackend, ServiceBridge, ServiceCallContext, SubscriptionId};
pub use story::{App, Argument, Context, Environment, Line, LineId, Method, Story};
pub use value::{StreamingService, Value};
