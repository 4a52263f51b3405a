//! In-memory `NarrativeStore`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use loom_core::arena::GameArena;
use loom_core::changeset::Changeset;
use loom_core::error::DomainError;
use loom_core::model::Game;
use loom_core::repository::NarrativeStore;

/// Keeps one arena per game behind a mutex. Commits apply a changeset to the
/// stored arena with the same guard and uniqueness checks the database
/// enforces, so concurrent callers see the same conflicts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    games: Mutex<HashMap<Uuid, GameArena>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, GameArena>>, DomainError> {
        self.games
            .lock()
            .map_err(|e| DomainError::Infrastructure(format!("store mutex poisoned: {e}")))
    }
}

#[async_trait]
impl NarrativeStore for MemoryStore {
    async fn create_game(&self, game: &Game) -> Result<(), DomainError> {
        let mut games = self.lock()?;
        if games.contains_key(&game.id) {
            return Err(DomainError::Infrastructure(format!(
                "game {} already exists",
                game.id
            )));
        }
        games.insert(game.id, GameArena::new(game.clone()));
        Ok(())
    }

    async fn load_arena(&self, game_id: Uuid) -> Result<GameArena, DomainError> {
        self.lock()?
            .get(&game_id)
            .cloned()
            .ok_or(DomainError::not_found("game", game_id))
    }

    async fn commit(&self, changeset: &Changeset) -> Result<(), DomainError> {
        let mut games = self.lock()?;
        let arena = games
            .get_mut(&changeset.game_id)
            .ok_or(DomainError::not_found("game", changeset.game_id))?;
        arena.apply(changeset)
    }

    async fn delete_game(&self, game_id: Uuid) -> Result<(), DomainError> {
        self.lock()?
            .remove(&game_id)
            .map(|_| ())
            .ok_or(DomainError::not_found("game", game_id))
    }
}
