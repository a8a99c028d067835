mod clevertap;
mod sentry_agent;
mod slack;

pub use clevertap::CleverTapAgent;
pub use sentry_agent::SentryAgent;
pub use slack::SlackAgent;
