//! Runtime story state: the parsed tree, the current context frame, and
//! the navigation/resolution operations the interpreter dispatches through.

mod context;
mod line;

pub use context::Context;
pub use line::{Argument, Line, LineId, Method};

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{EngineError, Result, StoryRef};
use crate::mutations;
use crate::value::Value;

/// External-collaborator handle for the app owning a story.
///
/// The app registry and lifecycle are out of scope; this is the shape the
/// engine needs from it.
#[derive(Debug, Clone)]
pub struct App {
    pub app_id: String,
    pub app_name: String,
    pub version: String,
    pub owner_email: String,
}

/// Immutable per-run configuration a story was started with.
#[derive(Debug, Clone, Default)]
pub struct Environment(pub HashMap<String, String>);

impl Environment {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// A runtime instance of a parsed story.
///
/// Invariant: for every line, `line.parent` either is null or references a
/// line whose `enter` transitively reaches this line. The engine does not
/// validate this on construction (it trusts the upstream compiler); it is
/// documented here because several handlers rely on it to terminate.
pub struct Story {
    pub app: Arc<App>,
    pub name: String,
    tree: HashMap<LineId, Line>,
    pub context: Context,
    pub environment: Environment,
}

impl Story {
    pub fn new(app: Arc<App>, name: impl Into<String>, tree: HashMap<LineId, Line>) -> Self {
        Story {
            app,
            name: name.into(),
            tree,
            context: Context::new(),
            environment: Environment::default(),
        }
    }

    pub fn story_ref(&self) -> StoryRef {
        StoryRef {
            app_id: self.app.app_id.clone(),
            story_name: self.name.clone(),
        }
    }

    pub fn line(&self, ln: &LineId) -> Option<&Line> {
        self.tree.get(ln)
    }

    /// The line following the entire construct `line` opens. `line.exit` is
    /// only a hint and may be stale (see `for`'s use of this instead); this
    /// always walks through `line.next`, which the compiler guarantees
    /// points past a block's nested children.
    pub fn next_block(&self, line: &Line) -> Option<&Line> {
        line.next.as_ref().and_then(|ln| self.line(ln))
    }

    /// Find the opening line of a function definition by its declared name.
    pub fn function_line_by_name(&self, name: &str) -> Option<&Line> {
        self.tree.values().find(|l| {
            l.method == Method::Function && l.function.as_deref() == Some(name)
        })
    }

    /// Build the context a `call` executes its callee block with: a fresh
    /// frame binding the function's declared parameter names (its `output`
    /// list) to the call site's resolved argument values, positionally.
    pub fn context_for_function_call(&self, call_line: &Line, function_line: &Line) -> Result<Context> {
        let mut ctx = Context::new();
        for (param, arg) in function_line.output.iter().zip(call_line.args.iter()) {
            let value = self.resolve(arg, true)?;
            ctx.set(param.clone(), value);
        }
        Ok(ctx)
    }

    /// Swap in a new current context, returning the old one so the caller
    /// can restore it later (used by `call`'s frame push/pop).
    pub fn set_context(&mut self, context: Context) -> Context {
        std::mem::replace(&mut self.context, context)
    }

    /// Resolve an argument expression against the current context.
    ///
    /// `encode` mirrors the Python engine's `story.resolve(arg, encode=...)`
    /// flag: condition evaluation resolves with `encode=false` (no string
    /// coercion of the raw value), while most other resolutions encode.
    /// The engine does not currently differentiate value encoding by this
    /// flag (there is no serialization boundary at this layer); it is kept
    /// for call-site fidelity and future wiring.
    pub fn resolve(&self, arg: &Argument, _encode: bool) -> Result<Value> {
        match arg {
            Argument::Literal(value) => Ok(value.clone()),
            Argument::Path(path) => self
                .context
                .get_path(path)
                .cloned()
                .ok_or_else(|| {
                    EngineError::ArgumentNotFound {
                        name: path.join("."),
                        story: Some(self.story_ref()),
                        line: None,
                    }
                }),
            Argument::Mutation { operator, arguments } => {
                let (first, rest) = arguments
                    .split_first()
                    .ok_or_else(|| EngineError::storyscript(
                        format!("mutation \"{operator}\" requires a subject value"),
                        Some(self.story_ref()),
                        None,
                    ))?;
                let subject = self.resolve(first, _encode)?;
                let resolved_rest = rest
                    .iter()
                    .map(|a| self.resolve(a, _encode))
                    .collect::<Result<Vec<_>>>()?;
                mutations::mutate(operator, &subject, &resolved_rest, self, None)
            }
        }
    }

    /// Bind a line's result into the context per its `output`/`name`
    /// assignment paths, mirroring `Story.end_line` in the original engine.
    pub fn end_line(&mut self, output: Value, assign_paths: &[Vec<String>]) {
        if assign_paths.len() == 1 {
            self.context.set_path(&assign_paths[0], output);
        } else if let Value::List(values) = output {
            for (path, value) in assign_paths.iter().zip(values.into_iter()) {
                self.context.set_path(path, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn test_app() -> Arc<App> {
        Arc::new(App {
            app_id: "app-1".into(),
            app_name: "Test App".into(),
            version: "1.0.0".into(),
            owner_email: "owner@example.com".into(),
        })
    }

    #[test]
    fn next_block_follows_next_not_exit() {
        let mut tree = HashMap::new();
        tree.insert(
            LineId::from("1"),
            Line::new("1", Method::For).with_next("2").with_exit("99"),
        );
        tree.insert(LineId::from("2"), Line::new("2", Method::Expression));
        let story = Story::new(test_app(), "s", tree);
        let line = story.line(&LineId::from("1")).unwrap();
        let next = story.next_block(line).unwrap();
        assert_eq!(next.ln, LineId::from("2"));
    }

    #[test]
    fn resolve_path_missing_is_argument_not_found() {
        let story = Story::new(test_app(), "s", HashMap::new());
        let err = story
            .resolve(&Argument::Path(vec!["missing".into()]), true)
            .unwrap_err();
        assert!(matches!(err, EngineError::ArgumentNotFound { .. }));
    }

    #[test]
    fn end_line_single_path_binds_whole_result() {
        let mut story = Story::new(test_app(), "s", HashMap::new());
        story.end_line(Value::Integer(5), &[vec!["x".to_string()]]);
        assert_eq!(story.context.get("x"), Some(&Value::Integer(5)));
    }

    #[test]
    fn end_line_multi_path_destructures_list_result() {
        let mut story = Story::new(test_app(), "s", HashMap::new());
        story.end_line(
            Value::List(vec![Value::Integer(1), Value::Integer(2)]),
            &[vec!["a".to_string()], vec!["b".to_string()]],
        );
        assert_eq!(story.context.get("a"), Some(&Value::Integer(1)));
        assert_eq!(story.context.get("b"), Some(&Value::Integer(2)));
    }
}
