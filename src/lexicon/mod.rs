//! The Lexicon: one handler per `Line::method`, each resolving its line's
//! effect against the current story context and returning either the next
//! line to run or a control-flow sentinel. `execute_block` is the loop that
//! walks a block from its `enter` line, dispatching each line in turn.
//!
//! Grounded line-for-line on `Lexicon.py`; `break`'s and `return`'s parent
//! walks, `for`'s use of `next_block` instead of `exit`, and `if`'s
//! elif/else chase loop are carried over unchanged in shape.

use futures::future::{BoxFuture, FutureExt};

use crate::error::{EngineError, Result};
use crate::sentinel::{Flow, Sentinel};
use crate::service::ServiceBridge;
use crate::story::{Context, Line, LineId, Method, Story};
use crate::value::Value;

/// Restores interpreter state on every exit path out of a guarded section —
/// including a `tokio` task abort, which drops an in-flight future without
/// running any code after its last `.await` but does run the `Drop` impls
/// of locals still alive in that future's state machine. `for`'s loop
/// binding and `call`'s context swap both hold one of these across their
/// recursive `execute_block` call instead of relying on cleanup code placed
/// after it.
struct LoopVarGuard<'a> {
    story: Option<&'a mut Story>,
    name: String,
}

impl<'a> LoopVarGuard<'a> {
    fn new(story: &'a mut Story, name: String) -> Self {
        LoopVarGuard { story: Some(story), name }
    }

    fn story(&mut self) -> &mut Story {
        self.story.as_mut().expect("guard already finished")
    }

    /// Removes the loop variable and hands the story back for use after
    /// the loop. Drop still runs afterward but finds nothing left to do.
    fn finish(mut self) -> &'a mut Story {
        let story = self.story.take().expect("guard already finished");
        story.context.remove(&self.name);
        story
    }
}

impl Drop for LoopVarGuard<'_> {
    fn drop(&mut self) {
        if let Some(story) = self.story.take() {
            story.context.remove(&self.name);
        }
    }
}

struct ContextGuard<'a> {
    story: Option<&'a mut Story>,
    caller_context: Option<Context>,
}

impl<'a> ContextGuard<'a> {
    fn new(story: &'a mut Story, caller_context: Context) -> Self {
        ContextGuard { story: Some(story), caller_context: Some(caller_context) }
    }

    fn story(&mut self) -> &mut Story {
        self.story.as_mut().expect("guard already finished")
    }

    fn finish(mut self) -> &'a mut Story {
        let story = self.story.take().expect("guard already finished");
        if let Some(ctx) = self.caller_context.take() {
            story.set_context(ctx);
        }
        story
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        if let (Some(story), Some(ctx)) = (self.story.take(), self.caller_context.take()) {
            story.set_context(ctx);
        }
    }
}

fn line_number_or_none(line: Option<&Line>) -> Option<LineId> {
    line.map(|l| l.ln.clone())
}

fn next_of(story: &Story, line: &Line) -> Option<LineId> {
    line_number_or_none(line.next.as_ref().and_then(|id| story.line(id)))
}

fn output_paths(names: &[String]) -> Vec<Vec<String>> {
    names.iter().map(|n| vec![n.clone()]).collect()
}

fn has_parent_method(story: &Story, line: &Line, wanted: Method) -> bool {
    let mut current = line.parent.clone();
    while let Some(id) = current {
        let Some(parent) = story.line(&id) else { return false };
        if parent.method == wanted {
            return true;
        }
        current = parent.parent.clone();
    }
    false
}

/// Runs a service with the resolved arguments as a command.
///
/// A line with an `enter` is a streaming service: it brings up a
/// container and binds it to the output name rather than running to
/// completion. A line without one runs to completion and binds its
/// result value.
async fn execute(bridge: &ServiceBridge, story: &mut Story, line: &Line) -> Result<Flow> {
    if line.enter.is_some() {
        let streaming = bridge.start_container(story, line).await?;
        story.end_line(Value::StreamingService(streaming), &output_paths(&line.output));
    } else {
        let output = bridge.execute(story, line).await?;
        if line.name.len() == 1 {
            story.end_line(output, &output_paths(&line.name));
        } else {
            story.end_line(output, &output_paths(&line.output));
        }
    }
    Ok(Flow::next(next_of(story, line)))
}

/// Function definitions are skipped on straight-line execution; only
/// `call` enters them. Returns the line past the whole definition.
async fn function_def(story: &Story, line: &Line) -> Result<Flow> {
    Ok(Flow::next(line_number_or_none(story.next_block(line))))
}

/// Calls the named function: pushes a fresh context frame bound to the
/// call's arguments, runs the function body, restores the caller's
/// context, and binds any returned value to the call's assignment names.
fn call<'a>(bridge: &'a ServiceBridge, story: &'a mut Story, line: &'a Line) -> BoxFuture<'a, Result<Flow>> {
    async move {
        let function_name = line.function.as_deref().ok_or_else(|| {
            EngineError::runtime("call line has no function name")
        })?;
        let function_line = story
            .function_line_by_name(function_name)
            .cloned()
            .ok_or_else(|| EngineError::storyscript(
                format!("function \"{function_name}\" is not defined"),
                Some(story.story_ref()),
                Some(line.ln.clone()),
            ))?;

        let caller_context = story.set_context(story.context_for_function_call(line, &function_line)?);
        let mut guard = ContextGuard::new(story, caller_context);

        let result = execute_block(bridge, guard.story(), &function_line).await;

        match result {
            Ok(Flow::Sentinel(Sentinel::Break)) => {
                guard.finish();
                Err(EngineError::runtime("a break sentinel escaped a function call"))
            }
            Err(e) => {
                guard.finish();
                Err(e)
            }
            Ok(Flow::Sentinel(Sentinel::Return(value))) => {
                let story = guard.finish();
                if !line.name.is_empty() {
                    story.end_line(value, &output_paths(&line.name));
                }
                Ok(Flow::next(next_of(story, line)))
            }
            Ok(Flow::Next(_)) => {
                let story = guard.finish();
                if !line.name.is_empty() {
                    story.end_line(Value::Null, &output_paths(&line.name));
                }
                Ok(Flow::next(next_of(story, line)))
            }
        }
    }
    .boxed()
}

/// `break` is only legal inside a `for` loop's nested block.
async fn break_(story: &Story, line: &Line) -> Result<Flow> {
    if has_parent_method(story, line, Method::For) {
        Ok(Flow::Sentinel(Sentinel::Break))
    } else {
        Err(EngineError::invalid_keyword("break", Some(story.story_ref()), Some(line.ln.clone())))
    }
}

/// `set x = <arg> [mutation]`.
async fn set(story: &mut Story, line: &Line) -> Result<Flow> {
    let value = story.resolve(
        line.args.first().ok_or_else(|| {
            EngineError::storyscript("set requires an argument", Some(story.story_ref()), Some(line.ln.clone()))
        })?,
        true,
    )?;
    story.end_line(value, &output_paths(&line.name));
    Ok(Flow::next(next_of(story, line)))
}

fn is_if_condition_true(story: &Story, line: &Line) -> Result<bool> {
    if line.args.len() != 1 {
        return Err(EngineError::storyscript(
            format!("complex if condition found! len={}", line.args.len()),
            Some(story.story_ref()),
            Some(line.ln.clone()),
        ));
    }
    Ok(story.resolve(&line.args[0], false)?.is_truthy())
}

/// Evaluates an `if`/`elif`/`elif`/`else` chain in one call: entering the
/// chain re-evaluates conditions until one is true (or `else` is reached),
/// returning its `enter` line. `elif`/`else` lines are never dispatched to
/// directly — execution always arrives at them via this chase loop, so a
/// direct dispatch just skips past the whole construct.
async fn if_condition(story: &Story, line: &Line) -> Result<Flow> {
    if line.method == Method::Elif || line.method == Method::Else {
        return Ok(Flow::next(line_number_or_none(story.next_block(line))));
    }

    let mut current = line;
    loop {
        let result = if current.method == Method::Else {
            true
        } else {
            is_if_condition_true(story, current)?
        };

        if result {
            return Ok(Flow::next(current.enter.clone()));
        }

        let Some(next_line) = story.next_block(current) else {
            return Ok(Flow::next(None));
        };

        if next_line.parent == current.parent
            && (next_line.method == Method::Elif || next_line.method == Method::Else)
        {
            current = next_line;
            continue;
        }

        return Ok(Flow::next(line_number_or_none(Some(next_line))));
    }
}

/// `unless <arg>`: the inverse of `if` with no elif/else chain.
async fn unless_condition(story: &Story, line: &Line) -> Result<Flow> {
    let result = story.resolve(
        line.args.first().ok_or_else(|| {
            EngineError::storyscript("unless requires an argument", Some(story.story_ref()), Some(line.ln.clone()))
        })?,
        false,
    )?;
    if result.is_truthy() {
        Ok(Flow::next(line_number_or_none(story.next_block(line))))
    } else {
        Ok(Flow::next(line.enter.clone()))
    }
}

/// Iterates `line.args[0]` (a list), binding each element to `line.output[0]`
/// and running the loop body as a block. `break` terminates the loop early;
/// any other sentinel bubbles up uninterpreted. The loop variable never
/// survives past the loop, even on early exit or error.
fn for_loop<'a>(bridge: &'a ServiceBridge, story: &'a mut Story, line: &'a Line) -> BoxFuture<'a, Result<Flow>> {
    async move {
        let list = story.resolve(
            line.args.first().ok_or_else(|| {
                EngineError::storyscript("for requires an iterable argument", Some(story.story_ref()), Some(line.ln.clone()))
            })?,
            false,
        )?;
        let items = match list {
            Value::List(items) => items,
            _ => {
                return Err(EngineError::ArgumentTypeMismatch {
                    arg_name: "list".into(),
                    expected_type: "list".into(),
                    story: Some(story.story_ref()),
                    line: Some(line.ln.clone()),
                });
            }
        };
        let output_name = line.output.first().cloned().ok_or_else(|| {
            EngineError::runtime("for loop has no output binding")
        })?;

        let mut guard = LoopVarGuard::new(story, output_name.clone());
        let mut outcome: Result<Option<Sentinel>> = Ok(None);

        for item in items {
            guard.story().context.set(output_name.clone(), item);

            match execute_block(bridge, guard.story(), line).await {
                Ok(Flow::Sentinel(Sentinel::Break)) => break,
                Ok(Flow::Sentinel(other)) => {
                    outcome = Ok(Some(other));
                    break;
                }
                Ok(Flow::Next(_)) => {}
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }

        let story = guard.finish();

        match outcome? {
            Some(sentinel) => Ok(Flow::Sentinel(sentinel)),
            None => Ok(Flow::next(line_number_or_none(story.next_block(line)))),
        }
    }
    .boxed()
}

/// Subscribes to an event on an already-running streaming service bound in
/// context under `line.service`.
async fn when(bridge: &ServiceBridge, story: &mut Story, line: &Line) -> Result<Flow> {
    let service_name = line.service.clone().unwrap_or_default();
    let streaming = story
        .context
        .get(&service_name)
        .and_then(Value::as_streaming_service)
        .cloned()
        .ok_or_else(|| {
            EngineError::storyscript(
                format!("unknown service {service_name} for when!"),
                Some(story.story_ref()),
                Some(line.ln.clone()),
            )
        })?;

    bridge.when(&streaming, story, line).await?;
    Ok(Flow::next(line_number_or_none(story.next_block(line))))
}

/// Stops execution of the nearest enclosing `when` or `function` block.
/// `when` blocks may not return a value; `function` blocks return at most
/// one.
async fn ret(story: &Story, line: &Line) -> Result<Flow> {
    if has_parent_method(story, line, Method::When) {
        if !line.args.is_empty() {
            return Err(EngineError::storyscript(
                "return may not be used with a value in a when block",
                Some(story.story_ref()),
                Some(line.ln.clone()),
            ));
        }
        return Ok(Flow::Sentinel(Sentinel::Return(Value::Null)));
    }

    if has_parent_method(story, line, Method::Function) {
        if line.args.len() > 1 {
            return Err(EngineError::storyscript(
                "multiple return values are not allowed",
                Some(story.story_ref()),
                Some(line.ln.clone()),
            ));
        }
        let value = match line.args.first() {
            Some(arg) => story.resolve(arg, true)?,
            None => Value::Null,
        };
        return Ok(Flow::Sentinel(Sentinel::Return(value)));
    }

    Err(EngineError::invalid_keyword("return", Some(story.story_ref()), Some(line.ln.clone())))
}

/// A bare expression line: resolved for its side effects (mutations may
/// have none, since they're pure, but resolution itself may fail and that
/// failure must surface).
async fn expression(story: &Story, line: &Line) -> Result<Flow> {
    if let Some(arg) = line.args.first() {
        story.resolve(arg, true)?;
    }
    Ok(Flow::next(next_of(story, line)))
}

async fn dispatch(bridge: &ServiceBridge, story: &mut Story, line: &Line) -> Result<Flow> {
    match line.method {
        Method::Execute => execute(bridge, story, line).await,
        Method::Set => set(story, line).await,
        Method::If | Method::Elif | Method::Else => if_condition(story, line).await,
        Method::Unless => unless_condition(story, line).await,
        Method::For => for_loop(bridge, story, line).await,
        Method::Function => function_def(story, line).await,
        Method::Call => call(bridge, story, line).await,
        Method::When => when(bridge, story, line).await,
        Method::Return => ret(story, line).await,
        Method::Break => break_(story, line).await,
        Method::Expression => expression(story, line).await,
    }
}

/// Walks a block starting at `block_line.enter`, dispatching each line
/// through the Lexicon until either the block runs out of lines (`Next`
/// with no line) or a handler returns a control-flow sentinel, which is
/// propagated to the caller without further dispatch.
pub fn execute_block<'a>(
    bridge: &'a ServiceBridge,
    story: &'a mut Story,
    block_line: &'a Line,
) -> BoxFuture<'a, Result<Flow>> {
    async move {
        let mut current = match &block_line.enter {
            Some(id) => story.line(id).cloned(),
            None => None,
        };

        loop {
            let Some(line) = current else {
                return Ok(Flow::Next(None));
            };

            match dispatch(bridge, story, &line).await? {
                Flow::Sentinel(s) => return Ok(Flow::Sentinel(s)),
                Flow::Next(None) => return Ok(Flow::Next(None)),
                Flow::Next(Some(next_id)) => {
                    current = story.line(&next_id).cloned();
                }
            }
        }
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::observability::MetricsRegistry;
    use crate::service::MockServiceBackend;
    use crate::story::{App, Argument};

    fn test_story(tree: HashMap<LineId, Line>) -> Story {
        let app = Arc::new(App {
            app_id: "app-1".into(),
            app_name: "Test".into(),
            version: "1".into(),
            owner_email: "o@example.com".into(),
        });
        Story::new(app, "story-1", tree)
    }

    fn bridge() -> ServiceBridge {
        ServiceBridge::new(Arc::new(MockServiceBackend::new()), Arc::new(MetricsRegistry::new()))
    }

    #[tokio::test]
    async fn set_binds_literal_value() {
        let mut tree = HashMap::new();
        tree.insert(
            LineId::from("1"),
            Line::new("1", Method::Set)
                .with_args(vec![Argument::Literal(Value::Integer(5))])
                .with_name(vec!["x"]),
        );
        let mut story = test_story(tree);
        let line = story.line(&LineId::from("1")).unwrap().clone();
        let bridge = bridge();

        let flow = dispatch(&bridge, &mut story, &line).await.unwrap();
        assert!(matches!(flow, Flow::Next(None)));
        assert_eq!(story.context.get("x"), Some(&Value::Integer(5)));
    }

    #[tokio::test]
    async fn break_outside_for_loop_is_invalid_keyword() {
        let mut tree = HashMap::new();
        tree.insert(LineId::from("1"), Line::new("1", Method::Break));
        let mut story = test_story(tree);
        let line = story.line(&LineId::from("1")).unwrap().clone();
        let bridge = bridge();

        let err = dispatch(&bridge, &mut story, &line).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidKeywordUsage { keyword: "break", .. }));
    }

    #[tokio::test]
    async fn break_inside_for_loop_yields_break_sentinel() {
        let mut tree = HashMap::new();
        tree.insert(
            LineId::from("1"),
            Line::new("1", Method::Break).with_parent("0"),
        );
        tree.insert(
            LineId::from("0"),
            Line::new("0", Method::For).with_args(vec![Argument::Literal(Value::List(vec![]))]),
        );
        let mut story = test_story(tree);
        let line = story.line(&LineId::from("1")).unwrap().clone();
        let bridge = bridge();

        let flow = dispatch(&bridge, &mut story, &line).await.unwrap();
        assert!(matches!(flow, Flow::Sentinel(Sentinel::Break)));
    }

    #[tokio::test]
    async fn for_loop_does_not_leak_its_variable() {
        let mut tree = HashMap::new();
        tree.insert(
            LineId::from("1"),
            Line::new("1", Method::For)
                .with_args(vec![Argument::Literal(Value::List(vec![Value::Integer(1), Value::Integer(2)]))])
                .with_output(vec!["item"])
                .with_next("2"),
        );
        tree.insert(LineId::from("2"), Line::new("2", Method::Expression));
        let mut story = test_story(tree);
        let line = story.line(&LineId::from("1")).unwrap().clone();
        let bridge = bridge();

        dispatch(&bridge, &mut story, &line).await.unwrap();
        assert_eq!(story.context.get("item"), None);
    }

    #[tokio::test]
    async fn return_outside_when_or_function_is_invalid_keyword() {
        let mut tree = HashMap::new();
        tree.insert(LineId::from("1"), Line::new("1", Method::Return));
        let mut story = test_story(tree);
        let line = story.line(&LineId::from("1")).unwrap().clone();
        let bridge = bridge();

        let err = dispatch(&bridge, &mut story, &line).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidKeywordUsage { keyword: "return", .. }));
    }

    #[tokio::test]
    async fn return_in_function_carries_its_value() {
        let mut tree = HashMap::new();
        tree.insert(
            LineId::from("1"),
            Line::new("1", Method::Return)
                .with_parent("0")
                .with_args(vec![Argument::Literal(Value::Integer(42))]),
        );
        tree.insert(LineId::from("0"), Line::new("0", Method::Function));
        let mut story = test_story(tree);
        let line = story.line(&LineId::from("1")).unwrap().clone();
        let bridge = bridge();

        let flow = dispatch(&bridge, &mut story, &line).await.unwrap();
        assert!(matches!(flow, Flow::Sentinel(Sentinel::Return(Value::Integer(42)))));
    }

    #[tokio::test]
    async fn if_false_chases_into_else() {
        let mut tree = HashMap::new();
        tree.insert(
            LineId::from("1"),
            Line::new("1", Method::If)
                .with_args(vec![Argument::Literal(Value::Boolean(false))])
                .with_next("2")
                .with_enter("10"),
        );
        tree.insert(LineId::from("2"), Line::new("2", Method::Else).with_enter("20"));
        let mut story = test_story(tree);
        // Both lines default to `parent: None`, which is what lets the
        // chase loop recognise the `else` as part of this `if`'s chain.
        let line = story.line(&LineId::from("1")).unwrap().clone();
        let bridge = bridge();

        let flow = dispatch(&bridge, &mut story, &line).await.unwrap();
        assert!(matches!(flow, Flow::Next(Some(id)) if id == LineId::from("20")));
    }
}
