//! Domain layer for the oracle context.

pub mod commands;
pub mod selection;
pub mod word_seeds;
