//! Routing keys for engine firings
//!
//! A [`NodeRef`] combines a base identity (a rule-graph node id or a function id)
//! with phase bits in the reserved high bits of a `u64`. Both ids are 32-bit, so
//! phase bits never overlap the base. Node refs never carry a function bit and
//! function refs always carry exactly one, so the two ranges cannot collide.
//!
//! Encoding is one-way: refs are only ever compared for equality.

use crate::symbols::{FunctionId, NodeId};
use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

bitflags! {
    /// Phase bits ORed into a [`NodeRef`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RefFlags: u64 {
        /// Node firing after the underlying insert/delete
        const AFTER_TRIGGER = 1 << 63;
        /// Node firing for a delete rather than an insert
        const DELETE_TRIGGER = 1 << 62;
        /// Event or call, before the call
        const BEFORE_FUNCTION = 1 << 61;
        /// Event or call, after the call
        const AFTER_FUNCTION = 1 << 60;
    }
}

/// Point relative to the engine operation at which a handler fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookPhase {
    Before,
    After,
    BeforeDelete,
    AfterDelete,
}

impl HookPhase {
    pub const ALL: [HookPhase; 4] = [
        HookPhase::Before,
        HookPhase::After,
        HookPhase::BeforeDelete,
        HookPhase::AfterDelete,
    ];

    pub fn is_after(self) -> bool {
        matches!(self, Self::After | Self::AfterDelete)
    }

    pub fn is_delete(self) -> bool {
        matches!(self, Self::BeforeDelete | Self::AfterDelete)
    }

    /// Name used by the script API
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
            Self::BeforeDelete => "beforeDelete",
            Self::AfterDelete => "afterDelete",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown hook phase {0:?}; expected before, after, beforeDelete or afterDelete")]
pub struct ParsePhaseError(pub String);

impl FromStr for HookPhase {
    type Err = ParsePhaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            "beforeDelete" => Ok(Self::BeforeDelete),
            "afterDelete" => Ok(Self::AfterDelete),
            other => Err(ParsePhaseError(other.to_string())),
        }
    }
}

/// 64-bit routing key for one firing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(u64);

impl NodeRef {
    fn compose(base: u32, flags: RefFlags) -> Self {
        Self(u64::from(base) | flags.bits())
    }

    /// Key for a node insert/delete firing
    pub fn node(node: NodeId, after: bool, deleted: bool) -> Self {
        let mut flags = RefFlags::empty();
        flags.set(RefFlags::AFTER_TRIGGER, after);
        flags.set(RefFlags::DELETE_TRIGGER, deleted);
        Self::compose(node.0, flags)
    }

    /// Key for an event or call firing
    pub fn function(function: FunctionId, after: bool) -> Self {
        let flag = if after {
            RefFlags::AFTER_FUNCTION
        } else {
            RefFlags::BEFORE_FUNCTION
        };
        Self::compose(function.0, flag)
    }

    /// Key a node-backed subscription listens on
    pub fn for_node_phase(node: NodeId, phase: HookPhase) -> Self {
        Self::node(node, phase.is_after(), phase.is_delete())
    }

    /// Key an event/call subscription listens on; `None` for delete phases
    pub fn for_function_phase(function: FunctionId, phase: HookPhase) -> Option<Self> {
        match phase {
            HookPhase::Before => Some(Self::function(function, false)),
            HookPhase::After => Some(Self::function(function, true)),
            HookPhase::BeforeDelete | HookPhase::AfterDelete => None,
        }
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn flags(self) -> RefFlags {
        RefFlags::from_bits_truncate(self.0)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}
