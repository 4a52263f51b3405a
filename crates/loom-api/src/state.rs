//! Shared application state.

use std::sync::{Arc, Mutex};

use loom_core::assistant::StoryAssistant;
use loom_core::clock::Clock;
use loom_core::context::EngineContext;
use loom_core::notification::Notifier;
use loom_core::repository::NarrativeStore;
use loom_core::rng::DeterministicRng;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock for deterministic time.
    pub clock: Arc<dyn Clock + Send + Sync>,
    /// RNG for fortune rolls, dice, word seeds and tie-breaks.
    pub rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    /// Game persistence.
    pub store: Arc<dyn NarrativeStore>,
    /// Text generation.
    pub assistant: Arc<dyn StoryAssistant>,
    /// Outbound notifications.
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock + Send + Sync>,
        rng: Arc<Mutex<dyn DeterministicRng + Send>>,
        store: Arc<dyn NarrativeStore>,
        assistant: Arc<dyn StoryAssistant>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            clock,
            rng,
            store,
            assistant,
            notifier,
        }
    }

    /// Borrows the collaborators for one command.
    #[must_use]
    pub fn ctx(&self) -> EngineContext<'_> {
        EngineContext {
            clock: &*self.clock,
            rng: &*self.rng,
            store: &*self.store,
            assistant: &*self.assistant,
            notifier: &*self.notifier,
        }
    }
}
