//! Integer mutations, grounded on `IntegerMutations.py`.

use crate::error::Result;
use crate::value::Value;

pub fn apply(operator: &str, value: &Value, _args: &[Value]) -> Option<Result<Value>> {
    let Value::Integer(n) = value else { return None };
    let n = *n;
    let result = match operator {
        "is_odd" => Value::Boolean(n % 2 != 0),
        "is_even" => Value::Boolean(n % 2 == 0),
        "absolute" => Value::Integer(n.abs()),
        "decrement" => Value::Integer(n - 1),
        "increment" => Value::Integer(n + 1),
        _ => return None,
    };
    Some(Ok(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_odd_matches_python_modulo_semantics() {
        assert_eq!(
            apply("is_odd", &Value::Integer(-3), &[]).unwrap().unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn increment_and_decrement() {
        assert_eq!(
            apply("increment", &Value::Integer(1), &[]).unwrap().unwrap(),
            Value::Integer(2)
        );
        assert_eq!(
            apply("decrement", &Value::Integer(1), &[]).unwrap().unwrap(),
            Value::Integer(0)
        );
    }

    #[test]
    fn unrecognized_operator_returns_none() {
        assert!(apply("reverse", &Value::Integer(1), &[]).is_none());
    }
}
