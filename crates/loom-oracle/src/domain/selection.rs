//! Interpretation choices: what a vote or a selection may point at, and
//! how a tie-break request becomes final text.

use loom_core::error::DomainError;
use loom_core::model::{
    CUSTOM_INTERPRETATION, OracleEvent, OracleVote, TIE_BREAK_REQUEST, TieBreakingMethod,
};
use loom_core::rng::DeterministicRng;
use loom_voting::domain::tie_break::oracle_tie_break;

/// A validated reference to an interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// One of the generated interpretations.
    Index(usize),
    /// Text supplied by a member.
    Custom(String),
    /// Let the votes decide.
    TieBreak,
}

impl Choice {
    /// Validates an index (and custom text) against `oracle`. Tie-break
    /// requests are accepted only when `allow_tie_break` is set.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an out-of-range index or a
    /// custom choice without text.
    pub fn parse(
        oracle: &OracleEvent,
        index: i32,
        custom_text: Option<&str>,
        allow_tie_break: bool,
    ) -> Result<Self, DomainError> {
        match index {
            CUSTOM_INTERPRETATION => match custom_text.map(str::trim) {
                Some(text) if !text.is_empty() => Ok(Self::Custom(text.to_owned())),
                _ => Err(DomainError::validation(
                    "custom text is required for a custom interpretation",
                )),
            },
            TIE_BREAK_REQUEST if allow_tie_break => Ok(Self::TieBreak),
            _ => usize::try_from(index)
                .ok()
                .filter(|i| *i < oracle.interpretations.len())
                .map(Self::Index)
                .ok_or_else(|| DomainError::validation("invalid interpretation index")),
        }
    }

    /// The index stored on a vote.
    #[must_use]
    pub fn stored_index(&self) -> i32 {
        match self {
            Self::Index(i) => i32::try_from(*i).unwrap_or(i32::MAX),
            Self::Custom(_) => CUSTOM_INTERPRETATION,
            Self::TieBreak => TIE_BREAK_REQUEST,
        }
    }
}

/// Turns a selection into the final interpretation text.
///
/// A tie-break picks among the votes with the game's method; landing on a
/// custom vote selects the earliest custom text.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a tie-break with no votes.
pub fn resolve(
    choice: Choice,
    oracle: &OracleEvent,
    votes: &[&OracleVote],
    method: TieBreakingMethod,
    rng: &mut dyn DeterministicRng,
) -> Result<String, DomainError> {
    match choice {
        Choice::Index(i) => oracle
            .interpretations
            .get(i)
            .cloned()
            .ok_or_else(|| DomainError::validation("invalid interpretation index")),
        Choice::Custom(text) => Ok(text),
        Choice::TieBreak => {
            let winner = oracle_tie_break(votes.iter().map(|v| v.interpretation_index), method, rng)
                .ok_or_else(|| DomainError::validation("no votes to break a tie between"))?;
            if winner == CUSTOM_INTERPRETATION {
                let mut custom: Vec<&&OracleVote> = votes
                    .iter()
                    .filter(|v| v.interpretation_index == CUSTOM_INTERPRETATION)
                    .collect();
                custom.sort_by_key(|v| v.cast_at);
                return custom
                    .first()
                    .and_then(|v| v.custom_text.clone())
                    .ok_or_else(|| DomainError::validation("custom vote has no text"));
            }
            let index = usize::try_from(winner)
                .map_err(|_| DomainError::validation("invalid interpretation index"))?;
            resolve(Choice::Index(index), oracle, votes, method, rng)
        }
    }
}
