//! The mutable per-frame variable mapping and the frame stack.

use std::collections::HashMap;

use crate::value::Value;

/// Mapping from variable name to value for the currently executing frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Resolve a dotted/nested path (`["user", "name"]`) against this
    /// context. Only maps nest; lists are not indexed by path segments
    /// (indexing happens through list mutations, not path resolution).
    pub fn get_path(&self, path: &[String]) -> Option<&Value> {
        let (head, rest) = path.split_first()?;
        let mut current = self.values.get(head)?;
        for segment in rest {
            match current {
                Value::Map(map) => current = map.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Assign a value at a dotted path, creating intermediate maps as
    /// needed. A single-segment path is a plain variable assignment.
    pub fn set_path(&mut self, path: &[String], value: Value) {
        match path.split_first() {
            None => {}
            Some((head, rest)) if rest.is_empty() => {
                self.set(head.clone(), value);
            }
            Some((head, rest)) => {
                let entry = self
                    .values
                    .entry(head.clone())
                    .or_insert_with(|| Value::Map(Default::default()));
                set_nested(entry, rest, value);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

fn set_nested(current: &mut Value, path: &[String], value: Value) {
    if !matches!(current, Value::Map(_)) {
        *current = Value::Map(Default::default());
    }
    let Value::Map(map) = current else { unreachable!() };
    match path.split_first() {
        None => {}
        Some((head, rest)) if rest.is_empty() => {
            map.insert(head.clone(), value);
        }
        Some((head, rest)) => {
            let entry = map
                .entry(head.clone())
                .or_insert_with(|| Value::Map(Default::default()));
            set_nested(entry, rest, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_segment_path_is_a_plain_assignment() {
        let mut ctx = Context::new();
        ctx.set_path(&["x".to_string()], Value::Integer(1));
        assert_eq!(ctx.get("x"), Some(&Value::Integer(1)));
    }

    #[test]
    fn nested_path_creates_intermediate_maps() {
        let mut ctx = Context::new();
        ctx.set_path(
            &["user".to_string(), "name".to_string()],
            Value::String("a".into()),
        );
        assert_eq!(
            ctx.get_path(&["user".to_string(), "name".to_string()]),
            Some(&Value::String("a".into()))
        );
    }

    #[test]
    fn remove_drops_the_binding_entirely() {
        let mut ctx = Context::new();
        ctx.set("x", Value::Integer(1));
        ctx.remove("x");
        assert!(!ctx.contains("x"));
    }
}
