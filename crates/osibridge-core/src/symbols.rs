//! Story symbol table seam
//!
//! The engine's symbol table is an external collaborator. The bridge only asks
//! it one question: "what is `name/arity`?"

use std::fmt;

/// Identifier of a node in the loaded rule graph.
///
/// Only stable within one loaded story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Identifier of an engine function (event, call, query, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn#{:08x}", self.0)
    }
}

/// Kind of a story symbol, as far as hooking is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// Engine-raised event, hooked at the call boundary
    Event,
    /// Built-in query backed by a node
    Query,
    /// Engine call, hooked at the call boundary
    Call,
    /// Story database
    Database,
    /// Story procedure
    Proc,
    /// User-defined query (`QRY`). Not hookable itself; its backing node is
    /// registered under a decorated name.
    DerivedQuery,
    /// Anything else the symbol table knows about
    Other,
}

impl FunctionKind {
    /// Kinds hooked by function id rather than by graph node
    pub fn is_call_boundary(self) -> bool {
        matches!(self, Self::Event | Self::Call)
    }

    /// Kinds that may be hooked at all (given a backing node where one is needed)
    pub fn is_hookable(self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// What the symbol table reports for a resolved `name/arity`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionDesc {
    pub kind: FunctionKind,
    pub function_id: FunctionId,
    /// Backing rule-graph node, when the symbol has one
    pub node: Option<NodeId>,
}

impl FunctionDesc {
    pub fn new(kind: FunctionKind, function_id: FunctionId) -> Self {
        Self {
            kind,
            function_id,
            node: None,
        }
    }

    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }
}

/// Lookup interface onto the loaded story
pub trait SymbolTable {
    /// Resolve `name/arity`, or `None` when the story has no such symbol
    fn lookup(&self, name: &str, arity: u32) -> Option<FunctionDesc>;
}

impl<T: SymbolTable + ?Sized> SymbolTable for std::rc::Rc<T> {
    fn lookup(&self, name: &str, arity: u32) -> Option<FunctionDesc> {
        (**self).lookup(name, arity)
    }
}
