//! Loom Core: shared domain model and abstractions.
//!
//! This crate defines the entities every decision subsystem works on, the
//! arena they are loaded into, the changeset a command commits, and the
//! traits for collaborators that live outside the engine (clock, random
//! source, store, story assistant, notifier). It contains no
//! infrastructure code.

pub mod arena;
pub mod assistant;
pub mod changeset;
pub mod clock;
pub mod command;
pub mod context;
pub mod error;
pub mod gateway;
pub mod model;
pub mod notification;
pub mod repository;
pub mod rng;
