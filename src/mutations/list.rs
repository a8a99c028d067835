//! List mutations — supplements the spec's "analogous operator set" line.

use crate::error::Result;
use crate::value::Value;

pub fn apply(operator: &str, value: &Value, args: &[Value]) -> Option<Result<Value>> {
    let Value::List(items) = value else { return None };
    let result = match operator {
        "length" => Value::Integer(items.len() as i64),
        "contains" => Value::Boolean(args.first().is_some_and(|needle| items.contains(needle))),
        "index_of" => match args.first().and_then(|needle| items.iter().position(|i| i == needle)) {
            Some(idx) => Value::Integer(idx as i64),
            None => Value::Integer(-1),
        },
        "append" => {
            let mut next = items.clone();
            if let Some(v) = args.first() {
                next.push(v.clone());
            }
            Value::List(next)
        }
        "prepend" => {
            let mut next = items.clone();
            if let Some(v) = args.first() {
                next.insert(0, v.clone());
            }
            Value::List(next)
        }
        "reverse" => {
            let mut next = items.clone();
            next.reverse();
            Value::List(next)
        }
        "sort" => {
            let mut next = items.clone();
            next.sort_by(|a, b| compare(a, b));
            Value::List(next)
        }
        "unique" => {
            let mut seen = Vec::new();
            for item in items {
                if !seen.contains(item) {
                    seen.push(item.clone());
                }
            }
            Value::List(seen)
        }
        "join" => {
            let sep = args.first().and_then(Value::as_str).unwrap_or("");
            Value::String(
                items
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(sep),
            )
        }
        "slice" => {
            let start = args.first().and_then(Value::as_integer).unwrap_or(0).max(0) as usize;
            let end = args
                .get(1)
                .and_then(Value::as_integer)
                .map(|e| e.max(0) as usize)
                .unwrap_or(items.len());
            let end = end.min(items.len());
            let start = start.min(end);
            Value::List(items[start..end].to_vec())
        }
        "flatten" => {
            let mut flat = Vec::new();
            for item in items {
                match item {
                    Value::List(inner) => flat.extend(inner.iter().cloned()),
                    other => flat.push(other.clone()),
                }
            }
            Value::List(flat)
        }
        "min" => return items.iter().min_by(|a, b| compare(a, b)).cloned().map(Ok),
        "max" => return items.iter().max_by(|a, b| compare(a, b)).cloned().map(Ok),
        "sum" => {
            let mut total = 0.0;
            let mut all_int = true;
            for item in items {
                match item {
                    Value::Integer(n) => total += *n as f64,
                    Value::Float(n) => {
                        total += n;
                        all_int = false;
                    }
                    _ => {}
                }
            }
            if all_int {
                Value::Integer(total as i64)
            } else {
                Value::Float(total)
            }
        }
        _ => return None,
    };
    Some(Ok(result))
}

fn compare(a: &Value, b: &Value) -> std::cmp::Ordering {
    match (a.as_float(), b.as_float()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_prepend_do_not_mutate_input() {
        let v = Value::List(vec![Value::Integer(1)]);
        let appended = apply("append", &v, &[Value::Integer(2)]).unwrap().unwrap();
        assert_eq!(v, Value::List(vec![Value::Integer(1)]));
        assert_eq!(appended, Value::List(vec![Value::Integer(1), Value::Integer(2)]));
    }

    #[test]
    fn unique_preserves_first_occurrence_order() {
        let v = Value::List(vec![Value::Integer(1), Value::Integer(2), Value::Integer(1)]);
        assert_eq!(
            apply("unique", &v, &[]).unwrap().unwrap(),
            Value::List(vec![Value::Integer(1), Value::Integer(2)])
        );
    }

    #[test]
    fn sum_of_integers_stays_integer() {
        let v = Value::List(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
        assert_eq!(apply("sum", &v, &[]).unwrap().unwrap(), Value::Integer(6));
    }

    #[test]
    fn slice_clamps_out_of_range_bounds() {
        let v = Value::List(vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(
            apply("slice", &v, &[Value::Integer(0), Value::Integer(100)]).unwrap().unwrap(),
            Value::List(vec![Value::Integer(1), Value::Integer(2)])
        );
    }
}
