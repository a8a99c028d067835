//! Map mutations — supplements the spec's "analogous operator set" line.

use crate::error::Result;
use crate::value::Value;

pub fn apply(operator: &str, value: &Value, args: &[Value]) -> Option<Result<Value>> {
    let Value::Map(map) = value else { return None };
    let result = match operator {
        "length" => Value::Integer(map.len() as i64),
        "keys" => Value::List(map.keys().map(|k| Value::String(k.clone())).collect()),
        "values" => Value::List(map.values().cloned().collect()),
        "contains" => Value::Boolean(args.first().and_then(Value::as_str).is_some_and(|k| map.contains_key(k))),
        "get" => {
            let key = args.first().and_then(Value::as_str).unwrap_or("");
            map.get(key).cloned().unwrap_or_else(|| args.get(1).cloned().unwrap_or(Value::Null))
        }
        "pop" => {
            let key = args.first().and_then(Value::as_str).unwrap_or("");
            let mut next = map.clone();
            next.remove(key);
            Value::Map(next)
        }
        "flatten" => Value::List(
            map.iter()
                .map(|(k, v)| Value::List(vec![Value::String(k.clone()), v.clone()]))
                .collect(),
        ),
        _ => return None,
    };
    Some(Ok(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample() -> Value {
        let mut m = BTreeMap::new();
        m.insert("a".to_string(), Value::Integer(1));
        m.insert("b".to_string(), Value::Integer(2));
        Value::Map(m)
    }

    #[test]
    fn get_falls_back_to_default() {
        let v = sample();
        assert_eq!(
            apply("get", &v, &[Value::String("missing".into()), Value::Integer(99)]).unwrap().unwrap(),
            Value::Integer(99)
        );
    }

    #[test]
    fn pop_does_not_mutate_input_map() {
        let v = sample();
        let popped = apply("pop", &v, &[Value::String("a".into())]).unwrap().unwrap();
        assert!(matches!(&v, Value::Map(m) if m.contains_key("a")));
        assert!(matches!(popped, Value::Map(m) if !m.contains_key("a")));
    }

    #[test]
    fn flatten_produces_key_value_pairs() {
        let v = sample();
        let flat = apply("flatten", &v, &[]).unwrap().unwrap();
        assert_eq!(flat, Value::List(vec![
            Value::List(vec![Value::String("a".into()), Value::Integer(1)]),
            Value::List(vec![Value::String("b".into()), Value::Integer(2)]),
        ]));
    }
}
