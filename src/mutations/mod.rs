//! Namespaced dispatch from `(value-kind, operator-name)` to a pure
//! function `(operator, value, args) -> value`.
//!
//! Every operator is a pure, deterministic, side-effect-free transform: it
//! never mutates its input and always returns a new `Value`. An unknown
//! operator on a known kind is a `StoryscriptError`.

mod boolean;
mod float;
mod integer;
mod list;
mod map;
mod string;
mod time;

use crate::error::{EngineError, Result};
use crate::story::{LineId, Story};
use crate::value::Value;

pub fn mutate(
    operator: &str,
    value: &Value,
    args: &[Value],
    story: &Story,
    line: Option<&LineId>,
) -> Result<Value> {
    let outcome = match value {
        Value::Integer(_) => integer::apply(operator, value, args),
        Value::Float(_) => float::apply(operator, value, args),
        Value::String(_) => string::apply(operator, value, args),
        Value::List(_) => list::apply(operator, value, args),
        Value::Map(_) => map::apply(operator, value, args),
        Value::Boolean(_) => boolean::apply(operator, value, args),
        Value::StreamingService(_) | Value::Null => None,
    };

    match outcome {
        Some(result) => result,
        None => {
            // `time` mutations apply to strings/integers representing an
            // instant; try them as a fallback namespace before giving up.
            if let Some(result) = time::apply(operator, value, args) {
                return result;
            }
            Err(EngineError::storyscript(
                format!(
                    "Unknown mutation \"{operator}\" for a value of type \"{}\"",
                    value.kind()
                ),
                Some(story.story_ref()),
                line.cloned(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn story() -> Story {
        Story::new(
            Arc::new(crate::story::App {
                app_id: "a".into(),
                app_name: "a".into(),
                version: "1".into(),
                owner_email: "o@example.com".into(),
            }),
            "s",
            HashMap::new(),
        )
    }

    #[test]
    fn unknown_operator_on_known_kind_is_storyscript_error() {
        let s = story();
        let err = mutate("not_a_real_op", &Value::Integer(1), &[], &s, None).unwrap_err();
        assert!(matches!(err, EngineError::Storyscript { .. }));
    }

    #[test]
    fn mutation_never_mutates_input() {
        let s = story();
        let v = Value::Integer(4);
        let before = v.clone();
        let _ = mutate("increment", &v, &[], &s, None).unwrap();
        assert_eq!(v, before);
    }

    #[test]
    fn mutation_is_deterministic() {
        let s = story();
        let v = Value::Integer(4);
        let a = mutate("increment", &v, &[], &s, None).unwrap();
        let b = mutate("increment", &v, &[], &s, None).unwrap();
        assert_eq!(a, b);
    }
}
