//! Query handlers for the fortune context.

use loom_core::arena::GameArena;
use loom_core::error::DomainError;
use loom_core::model::{BeatStatus, FortuneRoll};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::table::{self, Chances};

/// A fortune roll with the odds it was made at.
#[derive(Debug, Clone, Serialize)]
pub struct FortuneRollView {
    /// The roll.
    #[serde(flatten)]
    pub roll: FortuneRoll,
    /// Display label of the odds tier.
    pub odds_label: &'static str,
    /// Display label of the result, once resolved.
    pub result_label: Option<&'static str>,
    /// Chance of each outcome at the captured tension.
    pub chances: Chances,
    /// Status of the beat holding the roll.
    pub beat_status: BeatStatus,
}

/// Builds the view of one roll.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the roll or its beat is missing.
pub fn fortune_roll_view(arena: &GameArena, roll_id: Uuid) -> Result<FortuneRollView, DomainError> {
    let roll = arena.fortune_roll(roll_id)?.clone();
    let beat_status = arena.beat(roll.beat_id)?.status;
    Ok(FortuneRollView {
        odds_label: roll.odds.label(),
        result_label: roll.result.map(|outcome| outcome.label()),
        chances: table::thresholds(roll.odds, roll.tension).chances(),
        beat_status,
        roll,
    })
}
