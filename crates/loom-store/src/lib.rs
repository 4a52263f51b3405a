//! Loom store: persistence for games and their decisions.
//!
//! [`MemoryStore`] keeps arenas in process and is used for tests and
//! database-less runs. [`PgNarrativeStore`] persists to PostgreSQL and
//! relies on table constraints for vote and proposal uniqueness.

pub mod memory;
pub mod pg_store;
pub mod schema;

pub use memory::MemoryStore;
pub use pg_store::PgNarrativeStore;
