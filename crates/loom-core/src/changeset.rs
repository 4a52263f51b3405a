//! Changesets: the unit a command commits to the store.
//!
//! A command loads a [`GameArena`], stages writes on a [`UnitOfWork`] (which
//! keeps a working copy of the arena current), and commits the resulting
//! [`Changeset`] in one store transaction. Guards are re-checked by the
//! store inside that transaction.

use uuid::Uuid;

use crate::arena::GameArena;
use crate::error::DomainError;
use crate::model::{
    Act, Beat, BeatComment, BeatStatus, FortuneRoll, Game, OracleComment, OracleEvent,
    OracleVote, Proposal, Scene, Vote,
};
use crate::repository::NarrativeStore;

/// A precondition re-checked atomically at commit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// The proposal is still open.
    ProposalOpen(Uuid),
    /// The fortune roll has no result yet.
    FortuneRollPending(Uuid),
    /// The oracle has no selected interpretation yet.
    OracleUnselected(Uuid),
    /// The beat is still in the expected status.
    BeatStatus {
        /// The beat to check.
        beat_id: Uuid,
        /// Status the command was decided against.
        expected: BeatStatus,
    },
}

/// A single entity write. Votes and comments are insert-only; everything
/// else is an upsert keyed by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    /// Upsert the game row.
    Game(Game),
    /// Upsert an act.
    Act(Act),
    /// Upsert a scene.
    Scene(Scene),
    /// Upsert a beat.
    Beat(Beat),
    /// Insert a beat comment.
    BeatComment(BeatComment),
    /// Upsert a proposal.
    Proposal(Proposal),
    /// Insert a vote.
    Vote(Vote),
    /// Upsert a fortune roll.
    FortuneRoll(FortuneRoll),
    /// Upsert an oracle event.
    Oracle(OracleEvent),
    /// Insert an interpretation vote.
    OracleVote(OracleVote),
    /// Insert an oracle comment.
    OracleComment(OracleComment),
}

/// Guards and writes committed together, all or nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changeset {
    /// The game every write belongs to.
    pub game_id: Uuid,
    /// Preconditions checked before any write.
    pub guards: Vec<Guard>,
    /// Writes in application order.
    pub writes: Vec<Write>,
}

impl Changeset {
    /// Creates an empty changeset for a game.
    #[must_use]
    pub fn new(game_id: Uuid) -> Self {
        Self {
            game_id,
            guards: Vec::new(),
            writes: Vec::new(),
        }
    }
}

/// A working copy of an arena plus the changeset that produced it.
#[derive(Debug, Clone)]
pub struct UnitOfWork {
    arena: GameArena,
    changeset: Changeset,
}

impl UnitOfWork {
    /// Starts a unit of work on a freshly loaded arena.
    #[must_use]
    pub fn new(arena: GameArena) -> Self {
        let changeset = Changeset::new(arena.game().id);
        Self { arena, changeset }
    }

    /// The arena with every staged write applied.
    #[must_use]
    pub fn arena(&self) -> &GameArena {
        &self.arena
    }

    /// The changeset staged so far.
    #[must_use]
    pub fn changeset(&self) -> &Changeset {
        &self.changeset
    }

    /// Checks a guard now and records it for the commit.
    ///
    /// # Errors
    ///
    /// Returns the guard's failure if it does not hold on the working copy.
    pub fn guard(&mut self, guard: Guard) -> Result<(), DomainError> {
        self.arena.check(&guard)?;
        if !self.changeset.guards.contains(&guard) {
            self.changeset.guards.push(guard);
        }
        Ok(())
    }

    /// Applies a write to the working copy and records it.
    ///
    /// # Errors
    ///
    /// Returns a `Conflict` or `NotFound` error if the write breaks a
    /// uniqueness rule or references a missing entity.
    pub fn stage(&mut self, write: Write) -> Result<(), DomainError> {
        self.arena.put(write.clone())?;
        self.changeset.writes.push(write);
        Ok(())
    }

    /// Returns `true` if nothing has been staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changeset.writes.is_empty()
    }

    /// Commits the changeset and returns the updated arena. An empty unit of
    /// work does not touch the store.
    ///
    /// # Errors
    ///
    /// Returns whatever the store reports; nothing is written on error.
    pub async fn commit(self, store: &dyn NarrativeStore) -> Result<GameArena, DomainError> {
        if !self.is_empty() {
            store.commit(&self.changeset).await?;
        }
        Ok(self.arena)
    }
}
