//! The `Line` node and its `method` taxonomy.

use serde::{Deserialize, Serialize};

/// Opaque line identifier. Monotonic within a story in practice, but
/// callers must not rely on ordering — only on equality and the tree's
/// `next`/`enter`/`exit`/`parent` links.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineId(pub String);

impl From<&str> for LineId {
    fn from(value: &str) -> Self {
        LineId(value.to_string())
    }
}

impl From<String> for LineId {
    fn from(value: String) -> Self {
        LineId(value)
    }
}

impl std::fmt::Display for LineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The dispatchable method of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Execute,
    Set,
    If,
    Elif,
    Else,
    Unless,
    For,
    Function,
    Call,
    When,
    Return,
    Break,
    Expression,
}

/// An argument expression. The parser/compiler (out of scope) produces
/// these; the engine only resolves them against a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Argument {
    /// A literal value, already fully resolved.
    Literal(crate::value::Value),
    /// A path into the current context, e.g. `["user", "name"]`.
    Path(Vec<String>),
    /// A mutation applied to the preceding argument: `$OBJECT: "mutation"`.
    Mutation { operator: String, arguments: Vec<Argument> },
}

/// One node in the pre-parsed tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub ln: LineId,
    pub method: Method,
    pub service: Option<String>,
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<Argument>,
    /// Names bound to the line's result (for multi-output lines).
    #[serde(default)]
    pub output: Vec<String>,
    /// Assignment target paths, e.g. `set x = ...` binds to `["x"]`.
    #[serde(default)]
    pub name: Vec<String>,
    pub enter: Option<LineId>,
    /// Hint only — may be stale. Prefer `Story::next_block`.
    pub exit: Option<LineId>,
    pub next: Option<LineId>,
    pub parent: Option<LineId>,
    pub function: Option<String>,
}

impl Line {
    pub fn new(ln: impl Into<LineId>, method: Method) -> Self {
        Line {
            ln: ln.into(),
            method,
            service: None,
            command: None,
            args: Vec::new(),
            output: Vec::new(),
            name: Vec::new(),
            enter: None,
            exit: None,
            next: None,
            parent: None,
            function: None,
        }
    }

    pub fn with_next(mut self, next: impl Into<LineId>) -> Self {
        self.next = Some(next.into());
        self
    }

    pub fn with_enter(mut self, enter: impl Into<LineId>) -> Self {
        self.enter = Some(enter.into());
        self
    }

    pub fn with_exit(mut self, exit: impl Into<LineId>) -> Self {
        self.exit = Some(exit.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<LineId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_args(mut self, args: Vec<Argument>) -> Self {
        self.args = args;
        self
    }

    pub fn with_output(mut self, output: Vec<&str>) -> Self {
        self.output = output.into_iter().map(String::from).collect();
        self
    }

    pub fn with_name(mut self, name: Vec<&str>) -> Self {
        self.name = name.into_iter().map(String::from).collect();
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }
}
