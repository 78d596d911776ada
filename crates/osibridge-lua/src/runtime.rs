//! Lua 5.4 implementation of the script runtime seam
//!
//! Handlers live in the Lua registry. The evaluation stack is an explicit
//! `Vec<Value>` so the bridge can measure and restore its depth around every
//! call, including nested dispatch from inside a handler.

use crate::convert::osi_to_lua;
use crate::error::{LuaBridgeError, LuaBridgeResult};
use mlua::{Function, Lua, MultiValue, RegistryKey, Value};
use osibridge_config::DispatchConfig;
use osibridge_core::{CallStatus, HandlerRef, OsiValue, RuntimeError, ScriptRuntime, ScriptStack};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info};

struct RuntimeInner {
    lua: RefCell<Option<Lua>>,
    stack: RefCell<Vec<Value>>,
    handlers: RefCell<Vec<RegistryKey>>,
    max_stack_slots: usize,
}

/// Shared handle to one Lua state
#[derive(Clone)]
pub struct LuaRuntime {
    inner: Rc<RuntimeInner>,
}

impl std::fmt::Debug for LuaRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuaRuntime")
            .field("alive", &self.is_alive())
            .field("handlers", &self.handler_count())
            .field("stack_depth", &self.stack_depth())
            .finish()
    }
}

impl LuaRuntime {
    pub fn new(config: &DispatchConfig) -> Self {
        Self::with_lua(Lua::new(), config)
    }

    /// Wrap an existing state, e.g. one with extra libraries preloaded
    pub fn with_lua(lua: Lua, config: &DispatchConfig) -> Self {
        debug!(max_stack_slots = config.max_stack_slots, "Lua runtime created");
        Self {
            inner: Rc::new(RuntimeInner {
                lua: RefCell::new(Some(lua)),
                stack: RefCell::new(Vec::new()),
                handlers: RefCell::new(Vec::new()),
                max_stack_slots: config.max_stack_slots,
            }),
        }
    }

    /// The live state, or `None` after [`shutdown`](Self::shutdown)
    pub fn lua(&self) -> Option<Lua> {
        self.inner.lua.borrow().clone()
    }

    pub fn is_alive(&self) -> bool {
        self.inner.lua.borrow().is_some()
    }

    /// Anchor `handler` in the registry and hand out a reference to it
    pub fn store_handler(&self, handler: Function) -> LuaBridgeResult<HandlerRef> {
        let lua = self.lua().ok_or(LuaBridgeError::RuntimeShutDown)?;
        let key = lua.create_registry_value(handler)?;

        let mut handlers = self.inner.handlers.borrow_mut();
        handlers.push(key);
        Ok(HandlerRef((handlers.len() - 1) as u64))
    }

    pub fn handler_count(&self) -> usize {
        self.inner.handlers.borrow().len()
    }

    pub fn stack_depth(&self) -> usize {
        self.inner.stack.borrow().len()
    }

    /// Tear the state down. Later dispatches are skipped.
    pub fn shutdown(&self) {
        self.inner.stack.borrow_mut().clear();
        self.inner.handlers.borrow_mut().clear();
        if self.inner.lua.borrow_mut().take().is_some() {
            info!("Lua runtime shut down");
        }
    }
}

impl ScriptRuntime for LuaRuntime {
    type Stack<'a> = LuaStack<'a>;

    fn pin(&self) -> Option<Self::Stack<'_>> {
        let lua = self.lua()?;
        Some(LuaStack {
            rt: &self.inner,
            lua,
        })
    }
}

/// Evaluation stack pinned for one dispatch
pub struct LuaStack<'a> {
    rt: &'a RuntimeInner,
    lua: Lua,
}

impl LuaStack<'_> {
    fn push(&mut self, value: Value) {
        self.rt.stack.borrow_mut().push(value);
    }

    fn push_message(&mut self, message: &str) {
        let value = self
            .lua
            .create_string(message)
            .map(Value::String)
            .unwrap_or(Value::Nil);
        self.push(value);
    }
}

impl ScriptStack for LuaStack<'_> {
    fn top(&self) -> usize {
        self.rt.stack.borrow().len()
    }

    fn check_stack(&mut self, slots: usize) -> Result<(), RuntimeError> {
        let requested = self.top().saturating_add(slots);
        if requested > self.rt.max_stack_slots {
            return Err(RuntimeError::StackExhausted {
                requested,
                limit: self.rt.max_stack_slots,
            });
        }
        Ok(())
    }

    fn push_handler(&mut self, handler: HandlerRef) -> Result<(), RuntimeError> {
        let function = {
            let handlers = self.rt.handlers.borrow();
            let key = usize::try_from(handler.0)
                .ok()
                .and_then(|index| handlers.get(index))
                .ok_or(RuntimeError::UnknownHandler(handler.0))?;
            self.lua
                .registry_value::<Function>(key)
                .map_err(|_| RuntimeError::UnknownHandler(handler.0))?
        };
        self.push(Value::Function(function));
        Ok(())
    }

    fn push_value(&mut self, value: &OsiValue) -> Result<(), RuntimeError> {
        let value = osi_to_lua(&self.lua, value)
            .map_err(|err| RuntimeError::conversion(err.to_string()))?;
        self.push(value);
        Ok(())
    }

    fn call_with_traceback(&mut self, nargs: usize) -> CallStatus {
        // Detach the frame first: the handler may push onto this stack again
        let frame = {
            let mut stack = self.rt.stack.borrow_mut();
            let start = stack.len().saturating_sub(nargs + 1);
            stack.split_off(start)
        };

        let mut frame = frame.into_iter();
        let Some(Value::Function(function)) = frame.next() else {
            self.push_message("attempt to call a non-function value");
            return CallStatus::Failed;
        };

        match function.call::<()>(frame.collect::<MultiValue>()) {
            Ok(()) => CallStatus::Ok,
            Err(err) => {
                self.push_message(&err.to_string());
                CallStatus::Failed
            }
        }
    }

    fn top_message(&self) -> Option<String> {
        let value = self.rt.stack.borrow().last().cloned()?;
        match value {
            Value::String(s) => Some(s.to_string_lossy().to_string()),
            other => self
                .lua
                .globals()
                .get::<Function>("tostring")
                .and_then(|tostring| tostring.call::<String>(other))
                .ok(),
        }
    }

    fn pop(&mut self, count: usize) {
        let mut stack = self.rt.stack.borrow_mut();
        let keep = stack.len().saturating_sub(count);
        stack.truncate(keep);
    }
}
