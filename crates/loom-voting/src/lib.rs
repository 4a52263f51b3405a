//! Loom: Consensus engine.
//!
//! Opens proposals with the proposer's implicit vote, records votes,
//! decides when a proposal resolves and hands approved decisions to the
//! narrative state machine.

pub mod application;
pub mod domain;
