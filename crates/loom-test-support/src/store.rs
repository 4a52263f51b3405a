//! Test stores: one that always fails, and wrappers that interleave or cut
//! off the calls of another store.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use loom_core::arena::GameArena;
use loom_core::changeset::Changeset;
use loom_core::error::DomainError;
use loom_core::model::Game;
use loom_core::repository::NarrativeStore;
use tokio::sync::Barrier;
use uuid::Uuid;

/// A store that always returns an infrastructure error. Useful for testing
/// error-handling paths.
#[derive(Debug)]
pub struct FailingStore;

#[async_trait]
impl NarrativeStore for FailingStore {
    async fn create_game(&self, _game: &Game) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn load_arena(&self, _game_id: Uuid) -> Result<GameArena, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn commit(&self, _changeset: &Changeset) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn delete_game(&self, _game_id: Uuid) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

/// Wraps a store so the first `parties` loads read their snapshot, then wait
/// for each other before returning. Concurrent commands built on it all start
/// from the same snapshot.
pub struct RendezvousStore<'a> {
    inner: &'a dyn NarrativeStore,
    barrier: Barrier,
    gated: AtomicUsize,
}

impl<'a> RendezvousStore<'a> {
    /// Gates the first `parties` calls to `load_arena`.
    #[must_use]
    pub fn new(inner: &'a dyn NarrativeStore, parties: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(parties),
            gated: AtomicUsize::new(parties),
        }
    }
}

#[async_trait]
impl NarrativeStore for RendezvousStore<'_> {
    async fn create_game(&self, game: &Game) -> Result<(), DomainError> {
        self.inner.create_game(game).await
    }

    async fn load_arena(&self, game_id: Uuid) -> Result<GameArena, DomainError> {
        let arena = self.inner.load_arena(game_id).await?;
        let gated = self
            .gated
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if gated {
            self.barrier.wait().await;
        }
        Ok(arena)
    }

    async fn commit(&self, changeset: &Changeset) -> Result<(), DomainError> {
        self.inner.commit(changeset).await
    }

    async fn delete_game(&self, game_id: Uuid) -> Result<(), DomainError> {
        self.inner.delete_game(game_id).await
    }
}

/// Wraps a store so only the first `commits` commits go through; later ones
/// fail with an infrastructure error. Loads keep working.
pub struct CommitBudgetStore<'a> {
    inner: &'a dyn NarrativeStore,
    remaining: AtomicUsize,
}

impl<'a> CommitBudgetStore<'a> {
    /// Allows `commits` commits through to `inner`.
    #[must_use]
    pub fn new(inner: &'a dyn NarrativeStore, commits: usize) -> Self {
        Self {
            inner,
            remaining: AtomicUsize::new(commits),
        }
    }
}

#[async_trait]
impl NarrativeStore for CommitBudgetStore<'_> {
    async fn create_game(&self, game: &Game) -> Result<(), DomainError> {
        self.inner.create_game(game).await
    }

    async fn load_arena(&self, game_id: Uuid) -> Result<GameArena, DomainError> {
        self.inner.load_arena(game_id).await
    }

    async fn commit(&self, changeset: &Changeset) -> Result<(), DomainError> {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .map_err(|_| DomainError::Infrastructure("connection reset".into()))?;
        self.inner.commit(changeset).await
    }

    async fn delete_game(&self, game_id: Uuid) -> Result<(), DomainError> {
        self.inner.delete_game(game_id).await
    }
}
