//! Domain layer for the voting context.

pub mod commands;
pub mod dispatch;
pub mod resolution;
pub mod threshold;
pub mod tie_break;
