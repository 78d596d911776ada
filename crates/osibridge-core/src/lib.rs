//! Osiris callback bridge
//!
//! Lets script handlers observe story events raised inside the Osiris rule
//! engine. Patched engine entry points call into a [`CallbackManager`], which
//! routes each firing to its subscribers and runs them in the embedded script
//! runtime with per-handler failure isolation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  hook_node_vmts / bind   ┌──────────────────────┐
//! │ HookInstaller│◄─────────────────────────│   CallbackManager    │
//! └──────┬───────┘                          │                      │
//!        │ EngineCallbacks::*_hook          │  SubscriberRegistry  │◄── subscribe()
//!        └─────────────────────────────────►│  PendingCallbacks    │
//!                                           └──────────┬───────────┘
//!              SymbolTable::lookup (on story load)     │ guard::run_handler
//!                                                      ▼
//!                                           ┌──────────────────────┐
//!                                           │ ScriptRuntime/Stack  │
//!                                           └──────────────────────┘
//! ```
//!
//! Everything runs on the engine's evaluation thread. Dispatch is reentrant:
//! a handler may subscribe or trigger nested firings.
//!
//! ## Feature Flags
//!
//! - `test-utils`: in-memory [`testing`] collaborators

pub mod args;
pub mod binding;
pub mod callbacks;
pub mod error;
pub mod guard;
pub mod logging;
pub mod node_ref;
pub mod pending;
pub mod registry;
pub mod runtime;
pub mod symbols;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use args::{ArgumentDesc, ArgumentSource, OsiValue, TupleList, ValueType, NO_ARGS};
pub use binding::StoryBinding;
pub use callbacks::{CallbackManager, DispatchOutcome, EngineCallbacks, HookInstaller};
pub use error::{HookError, ResolveError, RuntimeError};
pub use guard::HandlerOutcome;
pub use logging::init_logging;
pub use node_ref::{HookPhase, NodeRef, ParsePhaseError, RefFlags};
pub use pending::{PendingCallbacks, Snapshot};
pub use registry::{HandlerId, HookSignature, ResolutionReport, SubscriberRegistry};
pub use runtime::{CallStatus, HandlerRef, ScriptRuntime, ScriptStack};
pub use symbols::{FunctionDesc, FunctionId, FunctionKind, NodeId, SymbolTable};
