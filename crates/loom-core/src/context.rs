//! Collaborators a command needs, bundled for handler signatures.

use std::sync::Mutex;

use tracing::debug;

use crate::assistant::StoryAssistant;
use crate::changeset::UnitOfWork;
use crate::clock::Clock;
use crate::command::Command;
use crate::error::DomainError;
use crate::notification::Notifier;
use crate::repository::NarrativeStore;
use crate::rng::DeterministicRng;

/// Borrowed collaborators for one command.
#[derive(Clone, Copy)]
pub struct EngineContext<'a> {
    /// Source of `now`.
    pub clock: &'a dyn Clock,
    /// Source of randomness; lock only around synchronous draws.
    pub rng: &'a Mutex<dyn DeterministicRng + Send>,
    /// Persistence.
    pub store: &'a dyn NarrativeStore,
    /// Text generation.
    pub assistant: &'a dyn StoryAssistant,
    /// Outbound notifications.
    pub notifier: &'a dyn Notifier,
}

impl EngineContext<'_> {
    /// Loads the game a command targets and starts a unit of work on it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the game does not exist, or the
    /// store's error.
    pub async fn begin(&self, command: &dyn Command) -> Result<UnitOfWork, DomainError> {
        debug!(
            command_type = command.command_type(),
            correlation_id = %command.correlation_id(),
            game_id = %command.game_id(),
            "loading game"
        );
        let arena = self.store.load_arena(command.game_id()).await?;
        Ok(UnitOfWork::new(arena))
    }

    /// Runs `draw` with the RNG locked. The guard is dropped before this
    /// returns, so it is never held across an await point.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the RNG mutex is poisoned.
    pub fn with_rng<T>(
        &self,
        draw: impl FnOnce(&mut dyn DeterministicRng) -> T,
    ) -> Result<T, DomainError> {
        let mut rng_guard = self
            .rng
            .lock()
            .map_err(|e| DomainError::Infrastructure(format!("RNG mutex poisoned: {e}")))?;
        Ok(draw(&mut *rng_guard))
    }
}
