//! Application layer for the fortune context.

pub mod command_handlers;
pub mod query_handlers;
