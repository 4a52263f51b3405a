//! Loom: Fortune rolls.
//!
//! A fortune roll asks the dice a yes/no question at declared odds, shifted
//! by the scene's tension. The roll waits out a contest window before it
//! resolves; an exceptional result sends its beat to a vote.

pub mod application;
pub mod domain;
