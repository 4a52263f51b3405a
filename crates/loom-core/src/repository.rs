//! Store abstraction.

use async_trait::async_trait;
use uuid::Uuid;

use crate::arena::GameArena;
use crate::changeset::Changeset;
use crate::error::DomainError;
use crate::model::Game;

/// Persistence for games and everything they own.
///
/// Implementations must enforce, at the storage level, one vote per
/// (proposal, voter), one interpretation vote per (oracle, voter) and one
/// open proposal per (game, type, target), reporting violations as
/// `DomainError::Conflict`. `commit` must check every guard and apply every
/// write in one transaction.
#[async_trait]
pub trait NarrativeStore: Send + Sync {
    /// Persists a new game.
    async fn create_game(&self, game: &Game) -> Result<(), DomainError>;

    /// Loads a game and every entity it owns.
    async fn load_arena(&self, game_id: Uuid) -> Result<GameArena, DomainError>;

    /// Checks the guards and applies the writes of a changeset atomically.
    async fn commit(&self, changeset: &Changeset) -> Result<(), DomainError>;

    /// Deletes a game and, by cascade, everything it owns.
    async fn delete_game(&self, game_id: Uuid) -> Result<(), DomainError>;
}
