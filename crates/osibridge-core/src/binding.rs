//! Story binding
//!
//! Ties the callback manager to the story lifecycle and counts story
//! generations so higher layers can drop caches bound to a previous graph.

use crate::callbacks::CallbackManager;
use crate::registry::ResolutionReport;
use crate::runtime::ScriptRuntime;
use std::cell::Cell;
use std::rc::Rc;
use tracing::info;

pub struct StoryBinding<R: ScriptRuntime + 'static> {
    generation: Cell<u32>,
    callbacks: Rc<CallbackManager<R>>,
}

impl<R: ScriptRuntime + 'static> StoryBinding<R> {
    pub fn new(callbacks: Rc<CallbackManager<R>>) -> Self {
        Self {
            generation: Cell::new(0),
            callbacks,
        }
    }

    /// Bumps the generation before re-deriving node routes
    pub fn story_loaded(&self) -> ResolutionReport {
        let generation = self.generation.get().wrapping_add(1);
        self.generation.set(generation);
        info!(generation, "Osiris story loaded");
        self.callbacks.story_loaded()
    }

    pub fn story_set_merging(&self, merging: bool) {
        self.callbacks.story_set_merging(merging);
    }

    pub fn generation(&self) -> u32 {
        self.generation.get()
    }

    pub fn callbacks(&self) -> &Rc<CallbackManager<R>> {
        &self.callbacks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemorySymbolTable, RecordingInstaller, RecordingRuntime};
    use osibridge_config::BridgeConfig;

    fn binding() -> StoryBinding<RecordingRuntime> {
        let manager = CallbackManager::new(
            RecordingRuntime::new(),
            Rc::new(MemorySymbolTable::new()),
            Rc::new(RecordingInstaller::new()),
            &BridgeConfig::default(),
        );
        StoryBinding::new(manager)
    }

    #[test]
    fn test_generation_bumps_per_load() {
        let binding = binding();
        assert_eq!(binding.generation(), 0);
        binding.story_loaded();
        binding.story_loaded();
        assert_eq!(binding.generation(), 2);
        assert!(binding.callbacks().is_story_loaded());
    }

    #[test]
    fn test_merging_forwarded() {
        let binding = binding();
        binding.story_set_merging(true);
        assert!(binding.callbacks().is_merging());
        binding.story_set_merging(false);
        assert!(!binding.callbacks().is_merging());
    }
}
