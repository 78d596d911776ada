//! `osiris` script module
//!
//! Exposes `osiris.register_listener(name, arity, phase, fn)` to scripts.

use crate::error::LuaBridgeError;
use crate::runtime::LuaRuntime;
use mlua::{Function, Lua, Result as LuaResult, Table};
use osibridge_core::{CallbackManager, HookPhase};
use std::rc::Weak;

/// Install the `osiris` global table.
///
/// The closure holds the manager weakly, since the manager owns the Lua state.
///
/// # Example
///
/// ```lua
/// osiris.register_listener("TextEvent", 1, "before", function(text)
///     print("text event: " .. text)
/// end)
/// ```
pub fn register_osiris_module(lua: &Lua, manager: Weak<CallbackManager<LuaRuntime>>) -> LuaResult<()> {
    let globals = lua.globals();
    let osiris = match globals.get::<Option<Table>>("osiris")? {
        Some(table) => table,
        None => lua.create_table()?,
    };

    let register_listener = lua.create_function(
        move |_, (name, arity, phase, handler): (String, u32, String, Function)| {
            let manager = manager.upgrade().ok_or(LuaBridgeError::ManagerUnavailable)?;
            let phase: HookPhase = phase.parse().map_err(LuaBridgeError::from)?;
            let handler = manager.runtime().store_handler(handler)?;
            let id = manager.subscribe(name, arity, phase, handler);
            Ok(id.index())
        },
    )?;

    osiris.set("register_listener", register_listener)?;
    globals.set("osiris", osiris)?;
    Ok(())
}
