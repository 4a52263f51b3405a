//! Application layer for the voting context.

pub mod command_handlers;
pub mod engine;
