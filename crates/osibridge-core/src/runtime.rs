//! Embedded scripting runtime seam
//!
//! The bridge never owns or inspects script values. It drives the runtime
//! through a small value-stack protocol:
//!
//! ```text
//! check_stack(1 + argc)
//! push_handler(handler)
//! push_value(arg) ...           one slot per argument, in order
//! call_with_traceback(argc)     pops function + args
//!   Ok      -> nothing left behind
//!   Failed  -> exactly one error value on top
//! ```

use crate::args::OsiValue;
use crate::error::RuntimeError;
use std::fmt;

/// Tagged reference to a handler owned by the script runtime.
///
/// Only the runtime that issued it knows what it points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerRef(pub u64);

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler#{}", self.0)
    }
}

/// Outcome of a protected call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Ok,
    /// The script raised an error; its message is the top stack value
    Failed,
}

/// Pinned access to the runtime's evaluation stack
pub trait ScriptStack {
    /// Current stack depth
    fn top(&self) -> usize;

    /// Make room for `slots` more values
    fn check_stack(&mut self, slots: usize) -> Result<(), RuntimeError>;

    fn push_handler(&mut self, handler: HandlerRef) -> Result<(), RuntimeError>;

    /// Push one native value, converted to its script representation
    fn push_value(&mut self, value: &OsiValue) -> Result<(), RuntimeError>;

    /// Call the function sitting below `nargs` arguments under the runtime's
    /// traceback handler
    fn call_with_traceback(&mut self, nargs: usize) -> CallStatus;

    /// Render the top value the way the runtime's `tostring` would
    fn top_message(&self) -> Option<String>;

    fn pop(&mut self, count: usize);
}

/// An embedded runtime that may or may not currently be alive
pub trait ScriptRuntime {
    type Stack<'a>: ScriptStack
    where
        Self: 'a;

    /// Pin the runtime for one dispatch; `None` when it has been torn down
    fn pin(&self) -> Option<Self::Stack<'_>>;
}
