//! Float mutations, grounded on `FloatMutations.py`.
//!
//! `round` here is `f64::round` (round-half-away-from-zero), which
//! diverges from Python's round-half-to-even for `.5` boundary cases.
//! The behavior isn't pinned by the spec; this divergence is recorded in
//! DESIGN.md as an accepted, documented difference.

use crate::value::Value;
use crate::error::Result;

pub fn apply(operator: &str, value: &Value, _args: &[Value]) -> Option<Result<Value>> {
    let Value::Float(n) = value else { return None };
    let n = *n;
    let result = match operator {
        "round" => Value::Integer(n.round() as i64),
        "ceil" => Value::Integer(n.ceil() as i64),
        "floor" => Value::Integer(n.floor() as i64),
        "sin" => Value::Float(n.sin()),
        "cos" => Value::Float(n.cos()),
        "tan" => Value::Float(n.tan()),
        "asin" => Value::Float(n.asin()),
        "acos" => Value::Float(n.acos()),
        "atan" => Value::Float(n.atan()),
        "log" => Value::Float(n.ln()),
        "log2" => Value::Float(n.log2()),
        "log10" => Value::Float(n.log10()),
        "exp" => Value::Float(n.exp()),
        "abs" => Value::Float(n.abs()),
        "is_nan" => Value::Boolean(n.is_nan()),
        "is_infinity" => Value::Boolean(n.is_infinite()),
        "sqrt" => Value::Float(n.sqrt()),
        _ => return None,
    };
    Some(Ok(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqrt_and_abs() {
        assert_eq!(apply("sqrt", &Value::Float(4.0), &[]).unwrap().unwrap(), Value::Float(2.0));
        assert_eq!(apply("abs", &Value::Float(-4.0), &[]).unwrap().unwrap(), Value::Float(4.0));
    }

    #[test]
    fn is_nan_detects_nan() {
        assert_eq!(
            apply("is_nan", &Value::Float(f64::NAN), &[]).unwrap().unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn ceil_and_floor_return_integers() {
        assert_eq!(apply("ceil", &Value::Float(1.2), &[]).unwrap().unwrap(), Value::Integer(2));
        assert_eq!(apply("floor", &Value::Float(1.8), &[]).unwrap().unwrap(), Value::Integer(1));
    }
}
