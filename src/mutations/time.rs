//! Time mutations.
//!
//! The value model (spec.md §3) has no dedicated `Time` variant — times are
//! represented either as a unix-epoch `Integer` (seconds) or an RFC 3339
//! `String`. This module is tried as a fallback namespace after the
//! primary kind dispatch misses, since both representations are also
//! valid `integer`/`string` values (see DESIGN.md).

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

use crate::error::{EngineError, Result};
use crate::value::Value;

const TIME_OPERATORS: &[&str] = &[
    "format",
    "unix_epoch",
    "year",
    "month",
    "day",
    "hour",
    "minute",
    "second",
    "add_seconds",
    "is_before",
    "is_after",
];

pub fn apply(operator: &str, value: &Value, args: &[Value]) -> Option<Result<Value>> {
    if !TIME_OPERATORS.contains(&operator) {
        return None;
    }
    let instant = match to_datetime(value) {
        Some(dt) => dt,
        None => return None,
    };

    let result = match operator {
        "format" => {
            let pattern = args.first().and_then(Value::as_str).unwrap_or("%Y-%m-%d %H:%M:%S");
            Value::String(instant.format(pattern).to_string())
        }
        "unix_epoch" => Value::Integer(instant.timestamp()),
        "year" => Value::Integer(instant.year() as i64),
        "month" => Value::Integer(instant.month() as i64),
        "day" => Value::Integer(instant.day() as i64),
        "hour" => Value::Integer(instant.hour() as i64),
        "minute" => Value::Integer(instant.minute() as i64),
        "second" => Value::Integer(instant.second() as i64),
        "add_seconds" => {
            let secs = args.first().and_then(Value::as_integer).unwrap_or(0);
            Value::Integer(instant.timestamp() + secs)
        }
        "is_before" | "is_after" => {
            let other = match args.first().and_then(to_datetime) {
                Some(dt) => dt,
                None => {
                    return Some(Err(EngineError::ArgumentTypeMismatch {
                        arg_name: "other".into(),
                        expected_type: "time".into(),
                        story: None,
                        line: None,
                    }))
                }
            };
            Value::Boolean(if operator == "is_before" {
                instant < other
            } else {
                instant > other
            })
        }
        _ => unreachable!(),
    };
    Some(Ok(result))
}

fn to_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Integer(epoch) => Utc.timestamp_opt(*epoch, 0).single(),
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_epoch_roundtrips_through_integer() {
        let v = Value::Integer(1_700_000_000);
        assert_eq!(apply("unix_epoch", &v, &[]).unwrap().unwrap(), Value::Integer(1_700_000_000));
    }

    #[test]
    fn is_before_compares_two_instants() {
        let a = Value::Integer(100);
        let b = Value::Integer(200);
        assert_eq!(apply("is_before", &a, &[b]).unwrap().unwrap(), Value::Boolean(true));
    }

    #[test]
    fn non_time_operator_falls_through() {
        assert!(apply("increment", &Value::Integer(1), &[]).is_none());
    }

    #[test]
    fn format_uses_provided_pattern() {
        let v = Value::Integer(0);
        let formatted = apply("format", &v, &[Value::String("%Y".into())]).unwrap().unwrap();
        assert_eq!(formatted, Value::String("1970".into()));
    }
}
