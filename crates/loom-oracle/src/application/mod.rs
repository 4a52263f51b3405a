//! Application layer for the oracle context.

pub mod command_handlers;
pub mod query_handlers;
