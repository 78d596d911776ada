//! Osiris callback manager
//!
//! Owns the subscriber registry and the pending-callback pool, and is the sink
//! the patched engine calls into.
//!
//! ## Firing
//!
//! ```text
//! engine ──► EngineCallbacks::*_hook ──► NodeRef
//!                                          │
//!                  merging? no subscribers? ──► return
//!                                          │
//!                        pin runtime (skip if torn down)
//!                                          │
//!                    PendingCallbacks::enter(handlers_for(ref))
//!                                          │
//!                   for each id: guard::run_handler(...)
//!                                          │
//!                           PendingCallbacks::exit
//! ```
//!
//! No `RefCell` borrow is held while a handler runs, so handlers may subscribe
//! or fire nested events freely.

use crate::args::{ArgumentDesc, ArgumentSource, TupleList, NO_ARGS};
use crate::error::HookError;
use crate::guard;
use crate::node_ref::{HookPhase, NodeRef};
use crate::pending::PendingCallbacks;
use crate::registry::{HandlerId, HookSignature, ResolutionReport, SubscriberRegistry};
use crate::runtime::{HandlerRef, ScriptRuntime};
use crate::symbols::{FunctionId, NodeId, SymbolTable};
use osibridge_config::BridgeConfig;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, warn};

/// Entry points the patched engine calls into
pub trait EngineCallbacks {
    fn insert_pre_hook(&self, node: NodeId, tuple: Option<&TupleList>, deleted: bool);
    fn insert_post_hook(&self, node: NodeId, tuple: Option<&TupleList>, deleted: bool);
    fn call_query_pre_hook(&self, node: NodeId, args: Option<&ArgumentDesc>);
    fn call_query_post_hook(&self, node: NodeId, args: Option<&ArgumentDesc>, succeeded: bool);
    fn call_pre_hook(&self, function: FunctionId, args: Option<&ArgumentDesc>);
    fn call_post_hook(&self, function: FunctionId, args: Option<&ArgumentDesc>, succeeded: bool);
    fn event_pre_hook(&self, function: FunctionId, args: Option<&ArgumentDesc>);
    fn event_post_hook(&self, function: FunctionId, args: Option<&ArgumentDesc>);
}

/// Thin adapter over the low-level patching layer
pub trait HookInstaller {
    /// Redirect the engine's rule-evaluation entry points into the bridge
    fn hook_node_vmts(&self) -> Result<(), HookError>;

    /// Set (or clear, with `None`) the sink patched code calls into
    fn bind_callback_manager(&self, sink: Option<Weak<dyn EngineCallbacks>>);
}

/// Summary of one firing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub invoked: usize,
    pub failed: usize,
}

pub struct CallbackManager<R: ScriptRuntime + 'static> {
    runtime: R,
    symbols: Rc<dyn SymbolTable>,
    installer: Rc<dyn HookInstaller>,
    registry: RefCell<SubscriberRegistry>,
    pending: RefCell<PendingCallbacks>,
    merging: Cell<bool>,
    story_loaded: Cell<bool>,
    hooked: Cell<bool>,
    self_ref: Weak<Self>,
}

impl<R: ScriptRuntime + 'static> std::fmt::Debug for CallbackManager<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackManager")
            .field("subscribers", &self.registry.borrow().len())
            .field("routes", &self.registry.borrow().active_routes())
            .field("depth", &self.pending.borrow().depth())
            .field("merging", &self.merging.get())
            .field("story_loaded", &self.story_loaded.get())
            .field("hooked", &self.hooked.get())
            .finish()
    }
}

impl<R: ScriptRuntime + 'static> CallbackManager<R> {
    pub fn new(
        runtime: R,
        symbols: Rc<dyn SymbolTable>,
        installer: Rc<dyn HookInstaller>,
        config: &BridgeConfig,
    ) -> Rc<Self> {
        Rc::new_cyclic(|self_ref| Self {
            runtime,
            symbols,
            installer,
            registry: RefCell::new(SubscriberRegistry::new(
                config.resolution.user_query_suffix.clone(),
            )),
            pending: RefCell::new(PendingCallbacks::with_levels(config.dispatch.pool_levels)),
            merging: Cell::new(false),
            story_loaded: Cell::new(false),
            hooked: Cell::new(false),
            self_ref: self_ref.clone(),
        })
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Register `handler` for `name/arity` at `phase`.
    ///
    /// Always succeeds. When a story is loaded the subscription is resolved
    /// immediately; a resolution failure is logged and retried on the next load.
    pub fn subscribe(
        &self,
        name: impl Into<String>,
        arity: u32,
        phase: HookPhase,
        handler: HandlerRef,
    ) -> HandlerId {
        let signature = HookSignature::new(name, arity, phase);
        debug!(%signature, %handler, "Osiris subscriber added");
        let id = self.registry.borrow_mut().add(signature, handler);

        if self.story_loaded.get() {
            self.hook_osiris();
            let result = self
                .registry
                .borrow_mut()
                .register_node_handler(id, self.symbols.as_ref());
            if let Err(err) = result {
                warn!("{}", err);
            }
        }

        id
    }

    /// Install engine hooks and bind this manager as the callback sink.
    ///
    /// Idempotent. A failed installation leaves the latch open for a retry.
    pub fn hook_osiris(&self) {
        if self.hooked.get() {
            return;
        }

        if let Err(err) = self.installer.hook_node_vmts() {
            error!("{}", err);
            return;
        }

        let sink: Weak<dyn EngineCallbacks> = self.self_ref.clone();
        self.installer.bind_callback_manager(Some(sink));
        self.hooked.set(true);
        info!("Osiris node hooks installed");
    }

    /// A story has been (re)loaded: hook and rebuild the node map
    pub fn story_loaded(&self) -> ResolutionReport {
        self.hook_osiris();
        self.story_loaded.set(true);

        let report = self
            .registry
            .borrow_mut()
            .resolve_and_register_all(self.symbols.as_ref());
        {
            let registry = self.registry.borrow();
            for (id, err) in &report.rejected {
                match registry.signature(*id) {
                    Some(signature) => warn!(%signature, "{}", err),
                    None => warn!("{}", err),
                }
            }
        }
        info!(
            registered = report.registered,
            rejected = report.rejected.len(),
            "Osiris subscribers resolved"
        );
        report
    }

    /// Gate all dispatch while the engine merges story data
    pub fn story_set_merging(&self, merging: bool) {
        debug!(merging, "Osiris merge state changed");
        self.merging.set(merging);
    }

    pub fn is_merging(&self) -> bool {
        self.merging.get()
    }

    pub fn is_hooked(&self) -> bool {
        self.hooked.get()
    }

    pub fn is_story_loaded(&self) -> bool {
        self.story_loaded.get()
    }

    /// Current dispatch nesting depth
    pub fn dispatch_depth(&self) -> usize {
        self.pending.borrow().depth()
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.borrow().len()
    }

    /// Number of handlers currently routed to `node_ref`
    pub fn handler_count(&self, node_ref: NodeRef) -> usize {
        self.registry.borrow().handlers_for(node_ref).len()
    }

    /// Run every handler routed to `node_ref`
    pub fn run_handlers<A>(&self, node_ref: NodeRef, args: &A) -> DispatchOutcome
    where
        A: ArgumentSource + ?Sized,
    {
        if self.merging.get() {
            return DispatchOutcome::default();
        }

        if self.registry.borrow().handlers_for(node_ref).is_empty() {
            return DispatchOutcome::default();
        }

        let Some(mut stack) = self.runtime.pin() else {
            debug!(%node_ref, "Script runtime unavailable, skipping Osiris dispatch");
            return DispatchOutcome::default();
        };

        // Copy the ids out: a handler may subscribe and grow the node map
        let snapshot = {
            let registry = self.registry.borrow();
            self.pending
                .borrow_mut()
                .enter(registry.handlers_for(node_ref))
        };

        let mut outcome = DispatchOutcome::default();
        let mut index = 0;
        loop {
            let Some(id) = self.pending.borrow().get(&snapshot, index) else {
                break;
            };
            index += 1;

            let Some(handler) = self.registry.borrow().handler(id) else {
                continue;
            };

            outcome.invoked += 1;
            if guard::run_handler(&mut stack, handler, args).is_failure() {
                outcome.failed += 1;
            }
        }

        self.pending.borrow_mut().exit(snapshot);
        outcome
    }

    fn run_tuple(&self, node_ref: NodeRef, tuple: Option<&TupleList>) {
        match tuple {
            Some(tuple) => self.run_handlers(node_ref, tuple),
            None => self.run_handlers(node_ref, NO_ARGS),
        };
    }

    fn run_args(&self, node_ref: NodeRef, args: Option<&ArgumentDesc>) {
        match args {
            Some(args) => self.run_handlers(node_ref, args),
            None => self.run_handlers(node_ref, NO_ARGS),
        };
    }
}

impl<R: ScriptRuntime + 'static> EngineCallbacks for CallbackManager<R> {
    fn insert_pre_hook(&self, node: NodeId, tuple: Option<&TupleList>, deleted: bool) {
        self.run_tuple(NodeRef::node(node, false, deleted), tuple);
    }

    fn insert_post_hook(&self, node: NodeId, tuple: Option<&TupleList>, deleted: bool) {
        self.run_tuple(NodeRef::node(node, true, deleted), tuple);
    }

    fn call_query_pre_hook(&self, node: NodeId, args: Option<&ArgumentDesc>) {
        self.run_args(NodeRef::node(node, false, false), args);
    }

    fn call_query_post_hook(&self, node: NodeId, args: Option<&ArgumentDesc>, _succeeded: bool) {
        self.run_args(NodeRef::node(node, true, false), args);
    }

    fn call_pre_hook(&self, function: FunctionId, args: Option<&ArgumentDesc>) {
        self.run_args(NodeRef::function(function, false), args);
    }

    fn call_post_hook(&self, function: FunctionId, args: Option<&ArgumentDesc>, _succeeded: bool) {
        self.run_args(NodeRef::function(function, true), args);
    }

    fn event_pre_hook(&self, function: FunctionId, args: Option<&ArgumentDesc>) {
        self.run_args(NodeRef::function(function, false), args);
    }

    fn event_post_hook(&self, function: FunctionId, args: Option<&ArgumentDesc>) {
        self.run_args(NodeRef::function(function, true), args);
    }
}

impl<R: ScriptRuntime + 'static> Drop for CallbackManager<R> {
    fn drop(&mut self) {
        if self.hooked.get() {
            self.installer.bind_callback_manager(None);
        }
    }
}
