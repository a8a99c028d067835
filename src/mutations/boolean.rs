//! Boolean mutations — supplements the spec's "analogous operator set" line.

use crate::error::Result;
use crate::value::Value;

pub fn apply(operator: &str, value: &Value, args: &[Value]) -> Option<Result<Value>> {
    let Value::Boolean(b) = value else { return None };
    let b = *b;
    let result = match operator {
        "is_true" => Value::Boolean(b),
        "is_false" => Value::Boolean(!b),
        "xor" => {
            let other = args.first().map(Value::is_truthy).unwrap_or(false);
            Value::Boolean(b ^ other)
        }
        _ => return None,
    };
    Some(Ok(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xor_with_itself_is_false() {
        assert_eq!(
            apply("xor", &Value::Boolean(true), &[Value::Boolean(true)]).unwrap().unwrap(),
            Value::Boolean(false)
        );
    }

    #[test]
    fn is_false_negates() {
        assert_eq!(apply("is_false", &Value::Boolean(true), &[]).unwrap().unwrap(), Value::Boolean(false));
    }
}
