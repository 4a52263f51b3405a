//! Loom: Oracle consensus.
//!
//! An oracle turns an open question into three interpretations seeded by a
//! random word pair. Members vote for the reading they prefer and the
//! invoker makes the final, write-once selection.

pub mod application;
pub mod domain;
