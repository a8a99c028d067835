//! String mutations — supplements the spec's "analogous operator set"
//! line with the conventional minimal-complete set (see SPEC_FULL.md §4.2).

use crate::error::Result;
use crate::value::Value;

pub fn apply(operator: &str, value: &Value, args: &[Value]) -> Option<Result<Value>> {
    let Value::String(s) = value else { return None };
    let result = match operator {
        "length" => Value::Integer(s.chars().count() as i64),
        "contains" => Value::Boolean(args.first().and_then(Value::as_str).is_some_and(|n| s.contains(n))),
        "index_of" => match args.first().and_then(Value::as_str).and_then(|n| s.find(n)) {
            Some(idx) => Value::Integer(idx as i64),
            None => Value::Integer(-1),
        },
        "uppercase" => Value::String(s.to_uppercase()),
        "lowercase" => Value::String(s.to_lowercase()),
        "capitalize" => Value::String(capitalize(s)),
        "trim" => Value::String(s.trim().to_string()),
        "split" => {
            let sep = args.first().and_then(Value::as_str).unwrap_or(" ");
            Value::List(s.split(sep).map(|p| Value::String(p.to_string())).collect())
        }
        "replace" => {
            let old = args.first().and_then(Value::as_str).unwrap_or("");
            let new = args.get(1).and_then(Value::as_str).unwrap_or("");
            Value::String(s.replace(old, new))
        }
        "substring" => {
            let start = args.first().and_then(Value::as_integer).unwrap_or(0).max(0) as usize;
            let end = args
                .get(1)
                .and_then(Value::as_integer)
                .map(|e| e.max(0) as usize)
                .unwrap_or(s.chars().count());
            let chars: Vec<char> = s.chars().collect();
            let end = end.min(chars.len());
            let start = start.min(end);
            Value::String(chars[start..end].iter().collect())
        }
        "starts_with" => Value::Boolean(args.first().and_then(Value::as_str).is_some_and(|n| s.starts_with(n))),
        "ends_with" => Value::Boolean(args.first().and_then(Value::as_str).is_some_and(|n| s.ends_with(n))),
        "reverse" => Value::String(s.chars().rev().collect()),
        "to_int" => match s.trim().parse::<i64>() {
            Ok(n) => Value::Integer(n),
            Err(_) => return Some(Err(crate::error::EngineError::TypeValueRuntime {
                type_expected: "integer".into(),
                type_received: "string".into(),
                value: s.clone(),
            })),
        },
        "to_float" => match s.trim().parse::<f64>() {
            Ok(n) => Value::Float(n),
            Err(_) => return Some(Err(crate::error::EngineError::TypeValueRuntime {
                type_expected: "float".into(),
                type_received: "string".into(),
                value: s.clone(),
            })),
        },
        _ => return None,
    };
    Some(Ok(result))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_and_index_of() {
        let v = Value::String("hello world".into());
        assert_eq!(apply("contains", &v, &[Value::String("world".into())]).unwrap().unwrap(), Value::Boolean(true));
        assert_eq!(apply("index_of", &v, &[Value::String("world".into())]).unwrap().unwrap(), Value::Integer(6));
        assert_eq!(apply("index_of", &v, &[Value::String("xyz".into())]).unwrap().unwrap(), Value::Integer(-1));
    }

    #[test]
    fn split_and_join_roundtrip_shape() {
        let v = Value::String("a,b,c".into());
        let parts = apply("split", &v, &[Value::String(",".into())]).unwrap().unwrap();
        assert_eq!(parts, Value::List(vec![
            Value::String("a".into()), Value::String("b".into()), Value::String("c".into())
        ]));
    }

    #[test]
    fn to_int_failure_is_type_value_runtime_error() {
        let v = Value::String("not a number".into());
        let err = apply("to_int", &v, &[]).unwrap().unwrap_err();
        assert!(matches!(err, crate::error::EngineError::TypeValueRuntime { .. }));
    }

    #[test]
    fn capitalize_handles_empty_string() {
        assert_eq!(apply("capitalize", &Value::String(String::new()), &[]).unwrap().unwrap(), Value::String(String::new()));
    }
}
