//! In-memory collaborators for tests.
//!
//! - [`MemorySymbolTable`]: a story whose symbols are defined by hand
//! - [`RecordingInstaller`]: counts installations and exposes the bound sink so
//!   tests can play the engine
//! - [`RecordingRuntime`]: a value-stack runtime whose handlers follow a
//!   scripted [`Behavior`] and whose calls are recorded

use crate::args::{OsiValue, ValueType};
use crate::callbacks::{EngineCallbacks, HookInstaller};
use crate::error::{HookError, RuntimeError};
use crate::runtime::{CallStatus, HandlerRef, ScriptRuntime, ScriptStack};
use crate::symbols::{FunctionDesc, SymbolTable};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Symbol table backed by a map
#[derive(Debug, Default)]
pub struct MemorySymbolTable {
    symbols: RefCell<HashMap<(String, u32), FunctionDesc>>,
}

impl MemorySymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&self, name: impl Into<String>, arity: u32, desc: FunctionDesc) {
        self.symbols.borrow_mut().insert((name.into(), arity), desc);
    }

    pub fn remove(&self, name: &str, arity: u32) {
        self.symbols.borrow_mut().remove(&(name.to_string(), arity));
    }

    pub fn clear(&self) {
        self.symbols.borrow_mut().clear();
    }
}

impl SymbolTable for MemorySymbolTable {
    fn lookup(&self, name: &str, arity: u32) -> Option<FunctionDesc> {
        self.symbols
            .borrow()
            .get(&(name.to_string(), arity))
            .copied()
    }
}

/// Hook installer that records what the bridge asked of it
#[derive(Default)]
pub struct RecordingInstaller {
    installs: Cell<usize>,
    fail_next: Cell<bool>,
    sink: RefCell<Option<Weak<dyn EngineCallbacks>>>,
    bind_calls: Cell<usize>,
}

impl RecordingInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `hook_node_vmts` calls
    pub fn install_count(&self) -> usize {
        self.installs.get()
    }

    pub fn bind_calls(&self) -> usize {
        self.bind_calls.get()
    }

    /// Make the next installation attempt fail
    pub fn fail_next_install(&self) {
        self.fail_next.set(true);
    }

    pub fn is_bound(&self) -> bool {
        self.sink.borrow().is_some()
    }

    /// The bound callback sink, if it is still alive
    pub fn sink(&self) -> Option<Rc<dyn EngineCallbacks>> {
        self.sink.borrow().as_ref().and_then(Weak::upgrade)
    }
}

impl HookInstaller for RecordingInstaller {
    fn hook_node_vmts(&self) -> Result<(), HookError> {
        if self.fail_next.replace(false) {
            return Err(HookError::InstallFailed("node VMTs not resolved".into()));
        }
        self.installs.set(self.installs.get() + 1);
        Ok(())
    }

    fn bind_callback_manager(&self, sink: Option<Weak<dyn EngineCallbacks>>) {
        self.bind_calls.set(self.bind_calls.get() + 1);
        *self.sink.borrow_mut() = sink;
    }
}

/// What a recorded handler does when called
pub enum Behavior {
    Succeed,
    /// Raise a script error with this message
    Fail(String),
    /// Panic inside the call, as a native fault would
    Panic(String),
    /// Run arbitrary code; `Err` becomes a script error
    Run(Box<dyn Fn(&[OsiValue]) -> Result<(), String>>),
}

impl Behavior {
    pub fn run(f: impl Fn(&[OsiValue]) -> Result<(), String> + 'static) -> Self {
        Self::Run(Box::new(f))
    }
}

/// A call the runtime executed
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub handler: HandlerRef,
    pub args: Vec<OsiValue>,
}

#[derive(Debug, Clone)]
enum Slot {
    Handler(HandlerRef),
    Value(OsiValue),
    Error(String),
}

struct RecordingInner {
    alive: Cell<bool>,
    stack_limit: usize,
    stack: RefCell<Vec<Slot>>,
    handlers: RefCell<Vec<Rc<Behavior>>>,
    calls: RefCell<Vec<RecordedCall>>,
    rejected: RefCell<Vec<ValueType>>,
    leftover: Cell<usize>,
}

/// Value-stack runtime double. Clones share state.
#[derive(Clone)]
pub struct RecordingRuntime {
    inner: Rc<RecordingInner>,
}

impl Default for RecordingRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingRuntime {
    pub fn new() -> Self {
        Self::with_stack_limit(usize::MAX)
    }

    pub fn with_stack_limit(stack_limit: usize) -> Self {
        Self {
            inner: Rc::new(RecordingInner {
                alive: Cell::new(true),
                stack_limit,
                stack: RefCell::new(Vec::new()),
                handlers: RefCell::new(Vec::new()),
                calls: RefCell::new(Vec::new()),
                rejected: RefCell::new(Vec::new()),
                leftover: Cell::new(0),
            }),
        }
    }

    pub fn add_handler(&self, behavior: Behavior) -> HandlerRef {
        let mut handlers = self.inner.handlers.borrow_mut();
        handlers.push(Rc::new(behavior));
        HandlerRef((handlers.len() - 1) as u64)
    }

    /// Make `push_value` fail for values of this type
    pub fn reject_values_of(&self, ty: ValueType) {
        self.inner.rejected.borrow_mut().push(ty);
    }

    /// Make every call leave `count` stray values on the stack
    pub fn leave_behind(&self, count: usize) {
        self.inner.leftover.set(count);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.inner.calls.borrow().clone()
    }

    /// Handlers in the order they were called
    pub fn call_order(&self) -> Vec<HandlerRef> {
        self.inner.calls.borrow().iter().map(|c| c.handler).collect()
    }

    pub fn depth(&self) -> usize {
        self.inner.stack.borrow().len()
    }

    /// Tear the runtime down; later pins fail
    pub fn shutdown(&self) {
        self.inner.alive.set(false);
        self.inner.stack.borrow_mut().clear();
    }
}

/// Pinned [`RecordingRuntime`] stack
pub struct RecordingStack<'a> {
    inner: &'a RecordingInner,
}

impl ScriptRuntime for RecordingRuntime {
    type Stack<'a> = RecordingStack<'a>;

    fn pin(&self) -> Option<Self::Stack<'_>> {
        self.inner.alive.get().then(|| RecordingStack {
            inner: &self.inner,
        })
    }
}

impl ScriptStack for RecordingStack<'_> {
    fn top(&self) -> usize {
        self.inner.stack.borrow().len()
    }

    fn check_stack(&mut self, slots: usize) -> Result<(), RuntimeError> {
        let requested = self.top().saturating_add(slots);
        if requested > self.inner.stack_limit {
            return Err(RuntimeError::StackExhausted {
                requested,
                limit: self.inner.stack_limit,
            });
        }
        Ok(())
    }

    fn push_handler(&mut self, handler: HandlerRef) -> Result<(), RuntimeError> {
        if handler.0 as usize >= self.inner.handlers.borrow().len() {
            return Err(RuntimeError::UnknownHandler(handler.0));
        }
        self.inner.stack.borrow_mut().push(Slot::Handler(handler));
        Ok(())
    }

    fn push_value(&mut self, value: &OsiValue) -> Result<(), RuntimeError> {
        if self.inner.rejected.borrow().contains(&value.value_type()) {
            return Err(RuntimeError::conversion(format!(
                "{:?} values are rejected",
                value.value_type()
            )));
        }
        self.inner.stack.borrow_mut().push(Slot::Value(value.clone()));
        Ok(())
    }

    fn call_with_traceback(&mut self, nargs: usize) -> CallStatus {
        let frame = {
            let mut stack = self.inner.stack.borrow_mut();
            let base = stack.len() - nargs - 1;
            stack.split_off(base)
        };

        let mut slots = frame.into_iter();
        let Some(Slot::Handler(handler)) = slots.next() else {
            self.inner
                .stack
                .borrow_mut()
                .push(Slot::Error("attempt to call a non-function value".into()));
            return CallStatus::Failed;
        };
        let args: Vec<OsiValue> = slots
            .filter_map(|slot| match slot {
                Slot::Value(value) => Some(value),
                _ => None,
            })
            .collect();

        self.inner.calls.borrow_mut().push(RecordedCall {
            handler,
            args: args.clone(),
        });

        let behavior = Rc::clone(&self.inner.handlers.borrow()[handler.0 as usize]);
        let result = match behavior.as_ref() {
            Behavior::Succeed => Ok(()),
            Behavior::Fail(msg) => Err(msg.clone()),
            Behavior::Panic(msg) => panic!("{}", msg),
            Behavior::Run(f) => f(&args),
        };

        {
            let mut stack = self.inner.stack.borrow_mut();
            for _ in 0..self.inner.leftover.get() {
                stack.push(Slot::Value(OsiValue::None));
            }
        }

        match result {
            Ok(()) => CallStatus::Ok,
            Err(msg) => {
                self.inner.stack.borrow_mut().push(Slot::Error(msg));
                CallStatus::Failed
            }
        }
    }

    fn top_message(&self) -> Option<String> {
        self.inner.stack.borrow().last().map(|slot| match slot {
            Slot::Error(msg) => msg.clone(),
            Slot::Value(value) => value.to_string(),
            Slot::Handler(handler) => handler.to_string(),
        })
    }

    fn pop(&mut self, count: usize) {
        let mut stack = self.inner.stack.borrow_mut();
        let len = stack.len().saturating_sub(count);
        stack.truncate(len);
    }
}
