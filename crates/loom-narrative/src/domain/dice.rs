//! Dice notation: `[X]dY[±Z]`, e.g. `d20`, `2d6`, `3d10+2`, `2D6-1`.

use std::fmt;
use std::str::FromStr;

use loom_core::error::DomainError;
use loom_core::rng::DeterministicRng;
use serde::Serialize;
use thiserror::Error;

/// Most dice a single roll may throw.
pub const MAX_DICE: u32 = 100;

/// Most sides a single die may have.
pub const MAX_SIDES: u32 = 1000;

/// Why a dice notation was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    /// The text is not dice notation at all.
    #[error("invalid dice notation: {0:?}")]
    Malformed(String),
    /// More than [`MAX_DICE`] dice.
    #[error("too many dice: {0} (max {MAX_DICE})")]
    TooManyDice(u32),
    /// More than [`MAX_SIDES`] sides.
    #[error("too many sides: {0} (max {MAX_SIDES})")]
    TooManySides(u32),
}

impl From<DiceError> for DomainError {
    fn from(err: DiceError) -> Self {
        DomainError::Validation(err.to_string())
    }
}

/// A parsed dice expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceNotation {
    /// Number of dice, at least 1.
    pub count: u32,
    /// Sides per die, at least 1.
    pub sides: u32,
    /// Flat modifier added to the sum.
    pub modifier: i64,
}

/// The dice thrown and their total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiceRoll {
    /// Normalised notation.
    pub notation: String,
    /// Each die, in throw order.
    pub dice: Vec<u32>,
    /// Sum of the dice plus the modifier.
    pub total: i64,
}

fn positive(digits: &str, original: &str) -> Result<u32, DiceError> {
    let malformed = || DiceError::Malformed(original.to_owned());
    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(malformed());
    }
    // Anything too long for u32 is far past the limits anyway.
    digits.parse().or(Ok(u32::MAX))
}

impl FromStr for DiceNotation {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_ascii_lowercase();
        let malformed = || DiceError::Malformed(s.to_owned());

        let (count, rest) = text.split_once('d').ok_or_else(malformed)?;
        let count = if count.is_empty() {
            1
        } else {
            positive(count, s)?
        };

        let (sides, modifier) = match rest.find(['+', '-']) {
            Some(at) => {
                let (sides, modifier) = rest.split_at(at);
                let digits = &modifier[1..];
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(malformed());
                }
                let value: i64 = digits.parse().map_err(|_| malformed())?;
                let value = if modifier.starts_with('-') { -value } else { value };
                (sides, value)
            }
            None => (rest, 0),
        };
        let sides = positive(sides, s)?;

        if count > MAX_DICE {
            return Err(DiceError::TooManyDice(count));
        }
        if sides > MAX_SIDES {
            return Err(DiceError::TooManySides(sides));
        }
        Ok(Self {
            count,
            sides,
            modifier,
        })
    }
}

impl fmt::Display for DiceNotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{m}"),
            m => write!(f, "{m}"),
        }
    }
}

impl DiceNotation {
    /// Throws the dice.
    pub fn roll(&self, rng: &mut dyn DeterministicRng) -> DiceRoll {
        let dice: Vec<u32> = (0..self.count)
            .map(|_| rng.next_u32_range(1, self.sides))
            .collect();
        let total = dice.iter().map(|d| i64::from(*d)).sum::<i64>() + self.modifier;
        DiceRoll {
            notation: self.to_string(),
            dice,
            total,
        }
    }
}

/// Parses `notation` and rolls it.
///
/// # Errors
///
/// Returns `DiceError` if the notation is malformed or out of range.
pub fn roll_dice(notation: &str, rng: &mut dyn DeterministicRng) -> Result<DiceRoll, DiceError> {
    let parsed: DiceNotation = notation.parse()?;
    Ok(parsed.roll(rng))
}
