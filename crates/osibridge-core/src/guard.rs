//! Per-handler invocation guard
//!
//! Marshals arguments onto the script stack, runs the handler through the
//! runtime's protected call, and cleans up after both script errors and
//! native faults (panics unwinding out of the runtime). The stack depth after
//! [`run_handler`] equals the depth before it on every path.

use crate::args::ArgumentSource;
use crate::error::RuntimeError;
use crate::runtime::{CallStatus, HandlerRef, ScriptStack};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::error;

/// How one handler invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    Completed,
    /// The script raised an error
    ScriptError(String),
    /// Marshalling failed or native code panicked
    Fault(String),
    /// The runtime could not make room for the call
    Skipped(RuntimeError),
}

impl HandlerOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Completed)
    }
}

enum Fault {
    Runtime(RuntimeError),
    Panic(Box<dyn Any + Send>),
}

impl Fault {
    fn describe(&self) -> String {
        match self {
            Self::Runtime(err) => err.to_string(),
            Self::Panic(payload) => panic_message(payload.as_ref()),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run one handler with `args`, isolating any failure
pub fn run_handler<S, A>(stack: &mut S, handler: HandlerRef, args: &A) -> HandlerOutcome
where
    S: ScriptStack,
    A: ArgumentSource + ?Sized,
{
    let slots = 1 + args.count();
    if let Err(err) = stack.check_stack(slots) {
        error!(%handler, slots, "Osiris event handler skipped: {}", err);
        return HandlerOutcome::Skipped(err);
    }

    let stack_size = stack.top();

    let call = panic::catch_unwind(AssertUnwindSafe(|| -> Result<CallStatus, RuntimeError> {
        stack.push_handler(handler)?;

        let mut num_args = 0;
        for value in args.values() {
            stack.push_value(value)?;
            num_args += 1;
        }

        Ok(stack.call_with_traceback(num_args))
    }));

    let fault = match call {
        Ok(Ok(CallStatus::Ok)) => {
            restore_depth(stack, stack_size);
            return HandlerOutcome::Completed;
        }
        Ok(Ok(CallStatus::Failed)) => {
            let message = stack.top_message().unwrap_or_default();
            error!(%handler, "Osiris event handler failed: {}", message);
            restore_depth(stack, stack_size);
            return HandlerOutcome::ScriptError(message);
        }
        Ok(Err(err)) => Fault::Runtime(err),
        Err(payload) => Fault::Panic(payload),
    };

    let remaining = stack.top().saturating_sub(stack_size);
    if remaining > 0 {
        let message = stack.top_message().unwrap_or_default();
        error!(%handler, "Osiris event callback failed: {}", message);
        stack.pop(remaining);
    } else {
        error!(
            %handler,
            "Internal error during call Osiris event callback: {}",
            fault.describe()
        );
    }

    HandlerOutcome::Fault(fault.describe())
}

/// Drop whatever the call left above `stack_size`
fn restore_depth<S: ScriptStack>(stack: &mut S, stack_size: usize) {
    let leftover = stack.top().saturating_sub(stack_size);
    if leftover > 0 {
        stack.pop(leftover);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{OsiValue, TupleList, NO_ARGS};
    use crate::testing::{Behavior, RecordingRuntime};
    use crate::runtime::ScriptRuntime;

    #[test]
    fn test_success_passes_args_in_order() {
        let runtime = RecordingRuntime::new();
        let handler = runtime.add_handler(Behavior::Succeed);
        let tuple: TupleList = [OsiValue::Integer(1), OsiValue::String("two".into())]
            .into_iter()
            .collect();

        let mut stack = runtime.pin().unwrap();
        let outcome = run_handler(&mut stack, handler, &tuple);

        assert_eq!(outcome, HandlerOutcome::Completed);
        assert_eq!(runtime.depth(), 0);
        let calls = runtime.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].handler, handler);
        assert_eq!(
            calls[0].args,
            vec![OsiValue::Integer(1), OsiValue::String("two".into())]
        );
    }

    #[test]
    fn test_script_error_restores_depth() {
        let runtime = RecordingRuntime::new();
        let handler = runtime.add_handler(Behavior::Fail("boom".into()));

        let mut stack = runtime.pin().unwrap();
        let outcome = run_handler(&mut stack, handler, NO_ARGS);

        assert_eq!(outcome, HandlerOutcome::ScriptError("boom".into()));
        assert_eq!(runtime.depth(), 0);
    }

    #[test]
    fn test_panic_is_contained() {
        let runtime = RecordingRuntime::new();
        let handler = runtime.add_handler(Behavior::Panic("native fault".into()));

        let mut stack = runtime.pin().unwrap();
        let outcome = run_handler(&mut stack, handler, &[OsiValue::Integer(5)][..]);

        assert_eq!(outcome, HandlerOutcome::Fault("native fault".into()));
        assert_eq!(runtime.depth(), 0);
    }

    #[test]
    fn test_unknown_handler_is_a_fault() {
        let runtime = RecordingRuntime::new();

        let mut stack = runtime.pin().unwrap();
        let outcome = run_handler(&mut stack, HandlerRef(99), &[OsiValue::Integer(5)][..]);

        assert!(matches!(outcome, HandlerOutcome::Fault(_)));
        assert_eq!(runtime.depth(), 0);
    }

    #[test]
    fn test_conversion_failure_pops_partial_args() {
        let runtime = RecordingRuntime::new();
        let handler = runtime.add_handler(Behavior::Succeed);
        runtime.reject_values_of(crate::args::ValueType::Real);

        let args = [OsiValue::Integer(1), OsiValue::Real(2.0)];
        let mut stack = runtime.pin().unwrap();
        let outcome = run_handler(&mut stack, handler, &args[..]);

        assert!(matches!(outcome, HandlerOutcome::Fault(_)));
        assert_eq!(runtime.depth(), 0);
        assert!(runtime.calls().is_empty());
    }

    #[test]
    fn test_stack_limit_skips_handler() {
        let runtime = RecordingRuntime::with_stack_limit(2);
        let handler = runtime.add_handler(Behavior::Succeed);

        let args = [OsiValue::Integer(1), OsiValue::Integer(2)];
        let mut stack = runtime.pin().unwrap();
        let outcome = run_handler(&mut stack, handler, &args[..]);

        assert_eq!(
            outcome,
            HandlerOutcome::Skipped(RuntimeError::StackExhausted {
                requested: 3,
                limit: 2
            })
        );
        assert!(outcome.is_failure());
        assert!(runtime.calls().is_empty());
    }

    #[test]
    fn test_leftover_values_are_dropped() {
        let runtime = RecordingRuntime::new();
        let handler = runtime.add_handler(Behavior::Succeed);
        let failing = runtime.add_handler(Behavior::Fail("boom".into()));
        runtime.leave_behind(2);

        let mut stack = runtime.pin().unwrap();
        assert_eq!(run_handler(&mut stack, handler, NO_ARGS), HandlerOutcome::Completed);
        assert_eq!(runtime.depth(), 0);

        let outcome = run_handler(&mut stack, failing, NO_ARGS);
        assert!(outcome.is_failure());
        assert_eq!(runtime.depth(), 0);
    }
}
