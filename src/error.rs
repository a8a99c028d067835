//! Error taxonomy for the story execution engine.
//!
//! Errors split into: user-visible story errors (carry `story`/`line`),
//! keyword-misuse errors, service/backend failures, quota violations, and
//! internal invariant violations. The kind, not its representation, is
//! what the reporter branches on.

use std::fmt;

use crate::story::LineId;

/// Identifies the story a line-typed error occurred in, without requiring
/// a borrow of the full `Story`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryRef {
    pub app_id: String,
    pub story_name: String,
}

/// The engine's error taxonomy.
///
/// Every variant that can be attributed to a specific story/line carries
/// `story: Option<StoryRef>` and `line: Option<LineId>`. `root` carries a
/// causing error for chained failures (used by the reporter's stacktrace
/// rendering).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{}", format_storyscript_message(.message, .story, .line))]
    Storyscript {
        message: String,
        story: Option<StoryRef>,
        line: Option<LineId>,
        root: Option<Box<EngineError>>,
    },

    #[error("internal invariant violated: {message}")]
    Runtime {
        message: String,
        story: Option<StoryRef>,
        line: Option<LineId>,
    },

    #[error("Invalid usage of keyword \"{keyword}\".")]
    InvalidKeywordUsage {
        keyword: &'static str,
        story: Option<StoryRef>,
        line: Option<LineId>,
    },

    #[error("{name} is required, but not found")]
    ArgumentNotFound {
        name: String,
        story: Option<StoryRef>,
        line: Option<LineId>,
    },

    #[error("The argument \"{arg_name}\" does not match the expected type \"{expected_type}\"")]
    ArgumentTypeMismatch {
        arg_name: String,
        expected_type: String,
        story: Option<StoryRef>,
        line: Option<LineId>,
    },

    #[error("{name} is not implemented")]
    InvalidCommand {
        name: String,
        story: Option<StoryRef>,
        line: Option<LineId>,
    },

    #[error(
        "The service \"{name}\" was not found in the Storyscript Hub. \
         Hint: 1. Check with the Storyscript team if this service has been made public; \
         2. Service names are case sensitive"
    )]
    ServiceNotFound {
        name: String,
        story: Option<StoryRef>,
        line: Option<LineId>,
    },

    #[error(
        "The action \"{action}\" was not found in the service \"{service}\". \
         Hint: Check the Storyscript Hub for a list of supported actions for this service."
    )]
    ActionNotFound {
        service: String,
        action: String,
        story: Option<StoryRef>,
        line: Option<LineId>,
    },

    #[error(
        "The service \"{service}\" requires an environment variable \"{variable}\" which was \
         not specified. Please set it by running \"$ story config set {service}.{variable}=<value>\" \
         in your Storyscript app directory"
    )]
    EnvironmentVariableNotFound {
        service: String,
        variable: String,
        story: Option<StoryRef>,
        line: Option<LineId>,
    },

    #[error("Service {container_name} not registered!")]
    ContainerSpecNotRegistered {
        container_name: String,
        story: Option<StoryRef>,
        line: Option<LineId>,
    },

    #[error("{message}")]
    K8s {
        message: String,
        story: Option<StoryRef>,
        line: Option<LineId>,
    },

    #[error("Incompatible type assertion: Received {value} ({type_received}), but expected {type_expected}")]
    TypeAssertionRuntime {
        type_expected: String,
        type_received: String,
        value: String,
    },

    #[error("Type conversion failed from {type_received} to {type_expected} with `{value}`")]
    TypeValueRuntime {
        type_expected: String,
        type_received: String,
        value: String,
    },

    #[error(
        "Your app makes use of {volume_count} volumes. The total permissible limit during \
         Storyscript Beta is {max_volumes} volumes. Please see https://docs.storyscript.io/faq/ \
         for more information."
    )]
    TooManyVolumes { volume_count: u64, max_volumes: u64 },

    #[error(
        "Only {max_apps} active apps are allowed during Storyscript Beta. \
         Please see https://docs.storyscript.io/faq/ for more information."
    )]
    TooManyActiveApps { active_apps: u64, max_apps: u64 },

    #[error(
        "Your app makes use of {service_count} services. The total permissible limit during \
         Storyscript Beta is {max_services} services. Please see https://docs.storyscript.io/faq/ \
         for more information."
    )]
    TooManyServices { service_count: u64, max_services: u64 },
}

fn format_storyscript_message(
    message: &str,
    story: &Option<StoryRef>,
    line: &Option<LineId>,
) -> String {
    match (story, line) {
        (Some(s), Some(l)) => format!("{message} (story={}, line={})", s.story_name, l.0),
        _ => message.to_string(),
    }
}

impl EngineError {
    /// The `story`/`line` pair this error is attributed to, if any.
    pub fn story(&self) -> Option<&StoryRef> {
        match self {
            EngineError::Storyscript { story, .. }
            | EngineError::Runtime { story, .. }
            | EngineError::InvalidKeywordUsage { story, .. }
            | EngineError::ArgumentNotFound { story, .. }
            | EngineError::ArgumentTypeMismatch { story, .. }
            | EngineError::InvalidCommand { story, .. }
            | EngineError::ServiceNotFound { story, .. }
            | EngineError::ActionNotFound { story, .. }
            | EngineError::EnvironmentVariableNotFound { story, .. }
            | EngineError::ContainerSpecNotRegistered { story, .. }
            | EngineError::K8s { story, .. } => story.as_ref(),
            _ => None,
        }
    }

    pub fn line(&self) -> Option<LineId> {
        match self {
            EngineError::Storyscript { line, .. }
            | EngineError::Runtime { line, .. }
            | EngineError::InvalidKeywordUsage { line, .. }
            | EngineError::ArgumentNotFound { line, .. }
            | EngineError::ArgumentTypeMismatch { line, .. }
            | EngineError::InvalidCommand { line, .. }
            | EngineError::ServiceNotFound { line, .. }
            | EngineError::ActionNotFound { line, .. }
            | EngineError::EnvironmentVariableNotFound { line, .. }
            | EngineError::ContainerSpecNotRegistered { line, .. }
            | EngineError::K8s { line, .. } => line.clone(),
            _ => None,
        }
    }

    /// The causing error, for chained failures. Only `Storyscript` carries one.
    pub fn root(&self) -> Option<&EngineError> {
        match self {
            EngineError::Storyscript { root, .. } => root.as_deref(),
            _ => None,
        }
    }

    pub fn invalid_keyword(
        keyword: &'static str,
        story: Option<StoryRef>,
        line: Option<LineId>,
    ) -> Self {
        EngineError::InvalidKeywordUsage {
            keyword,
            story,
            line,
        }
    }

    pub fn storyscript(message: impl Into<String>, story: Option<StoryRef>, line: Option<LineId>) -> Self {
        EngineError::Storyscript {
            message: message.into(),
            story,
            line,
            root: None,
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        EngineError::Runtime {
            message: message.into(),
            story: None,
            line: None,
        }
    }
}

impl fmt::Display for StoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_id, self.story_name)
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_not_found_message_matches_original_hint() {
        let err = EngineError::ServiceNotFound {
            name: "slack".into(),
            story: None,
            line: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("Storyscript Hub"));
        assert!(msg.contains("case sensitive"));
    }

    #[test]
    fn environment_variable_not_found_includes_config_set_hint() {
        let err = EngineError::EnvironmentVariableNotFound {
            service: "slack".into(),
            variable: "TOKEN".into(),
            story: None,
            line: None,
        };
        assert!(err.to_string().contains("story config set slack.TOKEN=<value>"));
    }

    #[test]
    fn root_cause_is_accessible_for_chained_failures() {
        let inner = EngineError::runtime("disk full");
        let outer = EngineError::Storyscript {
            message: "write failed".into(),
            story: None,
            line: None,
            root: Some(Box::new(inner)),
        };
        assert!(outer.root().is_some());
        assert_eq!(outer.root().unwrap().to_string(), "internal invariant violated: disk full");
    }
}
