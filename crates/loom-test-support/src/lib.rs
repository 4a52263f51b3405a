//! Shared test doubles and fixtures for the Loom storytelling engine.

mod assistant;
mod clock;
mod fixtures;
mod gateway;
mod notifier;
mod rng;
mod store;

pub use assistant::{FailingAssistant, ScriptedAssistant};
pub use clock::{FixedClock, fixed_now};
pub use fixtures::Harness;
pub use gateway::OpenOnlyGateway;
pub use notifier::RecordingNotifier;
pub use rng::{MockRng, SequenceRng};
pub use store::{CommitBudgetStore, FailingStore, RendezvousStore};
