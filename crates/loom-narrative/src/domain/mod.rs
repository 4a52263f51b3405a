//! Domain layer for the narrative context.

pub mod beat_lifecycle;
pub mod commands;
pub mod dice;
pub mod state_machine;
