//! Assembled Lua bridge

use crate::error::{LuaBridgeError, LuaBridgeResult};
use crate::listener::register_osiris_module;
use crate::runtime::LuaRuntime;
use osibridge_config::{BridgeConfig, ConfigLoader};
use osibridge_core::{CallbackManager, HookInstaller, StoryBinding, SymbolTable};
use std::path::Path;
use std::rc::Rc;
use tracing::debug;

/// A Lua runtime wired to a callback manager and its story binding
pub struct LuaBridge {
    binding: StoryBinding<LuaRuntime>,
}

impl LuaBridge {
    pub fn new(
        config: &BridgeConfig,
        symbols: Rc<dyn SymbolTable>,
        installer: Rc<dyn HookInstaller>,
    ) -> LuaBridgeResult<Self> {
        let runtime = LuaRuntime::new(&config.dispatch);
        let lua = runtime.lua().ok_or(LuaBridgeError::RuntimeShutDown)?;

        let manager = CallbackManager::new(runtime, symbols, installer, config);
        register_osiris_module(&lua, Rc::downgrade(&manager))?;

        Ok(Self {
            binding: StoryBinding::new(manager),
        })
    }

    /// Build from a TOML file, falling back to defaults when it is missing
    pub fn from_config_file(
        path: impl AsRef<Path>,
        symbols: Rc<dyn SymbolTable>,
        installer: Rc<dyn HookInstaller>,
    ) -> LuaBridgeResult<Self> {
        let config = ConfigLoader::load_or_default(path)?;
        Self::new(&config, symbols, installer)
    }

    /// Run a script chunk; `name` shows up in error messages and tracebacks
    pub fn load_script(&self, name: &str, source: &str) -> LuaBridgeResult<()> {
        let lua = self.runtime().lua().ok_or(LuaBridgeError::RuntimeShutDown)?;
        lua.load(source).set_name(name).exec()?;
        debug!(script = name, "Lua script loaded");
        Ok(())
    }

    pub fn binding(&self) -> &StoryBinding<LuaRuntime> {
        &self.binding
    }

    pub fn manager(&self) -> &Rc<CallbackManager<LuaRuntime>> {
        self.binding.callbacks()
    }

    pub fn runtime(&self) -> &LuaRuntime {
        self.manager().runtime()
    }
}

impl std::fmt::Debug for LuaBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuaBridge")
            .field("generation", &self.binding.generation())
            .field("manager", self.manager())
            .finish()
    }
}
