//! Domain layer for the fortune context.

pub mod commands;
pub mod table;
