//! Lua 5.4 runtime for the Osiris callback bridge
//!
//! Implements the core crate's script-runtime seam on top of `mlua` and
//! exposes subscription to scripts:
//!
//! ```lua
//! osiris.register_listener("DB_Flag", 1, "after", function(flag)
//!     print("flag set: " .. flag)
//! end)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use osibridge_lua::LuaBridge;
//!
//! let bridge = LuaBridge::new(&config, symbols, installer)?;
//! bridge.load_script("listeners.lua", source)?;
//! bridge.binding().story_loaded();
//! ```

mod bridge;
pub mod convert;
mod error;
mod listener;
mod runtime;

pub use bridge::LuaBridge;
pub use convert::{infer_osi, lua_to_osi, osi_to_lua};
pub use error::{LuaBridgeError, LuaBridgeResult};
pub use listener::register_osiris_module;
pub use runtime::{LuaRuntime, LuaStack};
