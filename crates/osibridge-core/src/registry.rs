//! Subscriber registry
//!
//! Subscriptions live in an append-only arena indexed by [`HandlerId`]. Two
//! lookups sit on top of it:
//!
//! - by signature (`name/arity/phase`), the durable source of truth, filled as
//!   subscriptions arrive
//! - by [`NodeRef`], the hot path used on every firing. It is derived from the
//!   signatures plus the story's symbol table and rebuilt on every story load,
//!   since node ids do not survive a reload.
//!
//! Entries are never removed; in-flight dispatch snapshots hold bare indices.

use crate::error::ResolveError;
use crate::node_ref::{HookPhase, NodeRef};
use crate::runtime::HandlerRef;
use crate::symbols::{FunctionKind, SymbolTable};
use std::collections::HashMap;
use std::fmt;

/// Identity of a subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HookSignature {
    pub name: String,
    pub arity: u32,
    pub phase: HookPhase,
}

impl HookSignature {
    pub fn new(name: impl Into<String>, arity: u32, phase: HookPhase) -> Self {
        Self {
            name: name.into(),
            arity,
            phase,
        }
    }
}

impl fmt::Display for HookSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.name, self.arity, self.phase)
    }
}

/// Stable index of a subscription in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(usize);

impl HandlerId {
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Subscriber {
    signature: HookSignature,
    handler: HandlerRef,
}

/// Result of re-deriving the node map
#[derive(Debug, Default)]
pub struct ResolutionReport {
    pub registered: usize,
    pub rejected: Vec<(HandlerId, ResolveError)>,
}

/// Signature and node maps over an append-only handler arena
#[derive(Debug)]
pub struct SubscriberRegistry {
    subscribers: Vec<Subscriber>,
    by_name: HashMap<HookSignature, Vec<HandlerId>>,
    by_node: HashMap<NodeRef, Vec<HandlerId>>,
    user_query_suffix: String,
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new("__DEF__")
    }
}

impl SubscriberRegistry {
    pub fn new(user_query_suffix: impl Into<String>) -> Self {
        Self {
            subscribers: Vec::new(),
            by_name: HashMap::new(),
            by_node: HashMap::new(),
            user_query_suffix: user_query_suffix.into(),
        }
    }

    /// Append a subscription. Does not touch the node map.
    pub fn add(&mut self, signature: HookSignature, handler: HandlerRef) -> HandlerId {
        let id = HandlerId(self.subscribers.len());
        self.by_name.entry(signature.clone()).or_default().push(id);
        self.subscribers.push(Subscriber { signature, handler });
        id
    }

    pub fn handler(&self, id: HandlerId) -> Option<HandlerRef> {
        self.subscribers.get(id.0).map(|s| s.handler)
    }

    pub fn signature(&self, id: HandlerId) -> Option<&HookSignature> {
        self.subscribers.get(id.0).map(|s| &s.signature)
    }

    /// Subscriptions for an exact signature, in subscription order
    pub fn by_signature(&self, signature: &HookSignature) -> &[HandlerId] {
        self.by_name.get(signature).map_or(&[], Vec::as_slice)
    }

    /// Handlers routed to `node_ref`, in subscription order
    pub fn handlers_for(&self, node_ref: NodeRef) -> &[HandlerId] {
        self.by_node.get(&node_ref).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Number of (node ref, handler) routes in the node map
    pub fn active_routes(&self) -> usize {
        self.by_node.values().map(Vec::len).sum()
    }

    /// Compute the node ref a signature listens on for the current story
    pub fn resolve(
        &self,
        signature: &HookSignature,
        symbols: &dyn SymbolTable,
    ) -> Result<NodeRef, ResolveError> {
        let not_found = || ResolveError::SymbolNotFound {
            name: signature.name.clone(),
            arity: signature.arity,
        };

        let mut func = symbols
            .lookup(&signature.name, signature.arity)
            .ok_or_else(not_found)?;

        // User queries are not hookable themselves; hook the backing node
        if func.kind == FunctionKind::DerivedQuery {
            let decorated = format!("{}{}", signature.name, self.user_query_suffix);
            func = symbols
                .lookup(&decorated, signature.arity)
                .ok_or_else(not_found)?;
        }

        let not_hookable = || ResolveError::NotHookable {
            name: signature.name.clone(),
            arity: signature.arity,
        };

        if !func.kind.is_hookable() {
            return Err(not_hookable());
        }

        if func.kind.is_call_boundary() {
            return NodeRef::for_function_phase(func.function_id, signature.phase).ok_or_else(
                || ResolveError::DeleteTriggerUnsupported {
                    name: signature.name.clone(),
                    arity: signature.arity,
                    phase: signature.phase,
                },
            );
        }

        let node = func.node.ok_or_else(not_hookable)?;
        Ok(NodeRef::for_node_phase(node, signature.phase))
    }

    /// Resolve one subscription and route it in the node map
    pub fn register_node_handler(
        &mut self,
        id: HandlerId,
        symbols: &dyn SymbolTable,
    ) -> Result<NodeRef, ResolveError> {
        // Ids are only minted by `add`
        let node_ref = self.resolve(&self.subscribers[id.0].signature, symbols)?;
        self.by_node.entry(node_ref).or_default().push(id);
        Ok(node_ref)
    }

    /// Rebuild the node map from every subscription, in subscription order
    pub fn resolve_and_register_all(&mut self, symbols: &dyn SymbolTable) -> ResolutionReport {
        self.by_node.clear();

        let mut report = ResolutionReport::default();
        for index in 0..self.subscribers.len() {
            let id = HandlerId(index);
            match self.register_node_handler(id, symbols) {
                Ok(_) => report.registered += 1,
                Err(err) => report.rejected.push((id, err)),
            }
        }
        report
    }
}
