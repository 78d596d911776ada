//! Error types for the callback bridge

use crate::node_ref::HookPhase;
use thiserror::Error;

/// Why a subscription could not be turned into an active hook.
///
/// Never fatal: the subscription stays registered and is retried on the next
/// story load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Couldn't register Osiris subscriber for {name}/{arity}: Symbol not found in story.")]
    SymbolNotFound { name: String, arity: u32 },

    #[error(
        "Couldn't register Osiris subscriber for {name}/{arity}: Symbol must be an event, query, call, DB, PROC or QRY."
    )]
    NotHookable { name: String, arity: u32 },

    #[error(
        "Couldn't register Osiris subscriber for {name}/{arity}: {phase} triggers not supported on events or calls."
    )]
    DeleteTriggerUnsupported {
        name: String,
        arity: u32,
        phase: HookPhase,
    },
}

/// Faults raised by the script runtime while preparing or running a handler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("Unknown handler reference {0}")]
    UnknownHandler(u64),

    #[error("Value conversion failed: {0}")]
    Conversion(String),

    #[error("Script stack exhausted: {requested} slots requested, limit is {limit}")]
    StackExhausted { requested: usize, limit: usize },
}

impl RuntimeError {
    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }
}

/// Failure reported by the low-level hook installer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("Failed to install engine hooks: {0}")]
    InstallFailed(String),
}
