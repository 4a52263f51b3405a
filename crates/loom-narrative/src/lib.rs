//! Loom: Narrative state machine.
//!
//! Owns the Act → Scene → Beat lifecycle: proposing acts and scenes,
//! submitting beats, the challenge/revision cycle, and the transitions an
//! approved proposal applies.

pub mod application;
pub mod domain;
