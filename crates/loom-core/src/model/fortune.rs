use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::story::Tension;

/// How likely the asker thinks a "yes" is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OddsTier {
    /// Almost never.
    Impossible,
    /// Rarely.
    VeryUnlikely,
    /// Less often than not.
    Unlikely,
    /// Even odds.
    FiftyFifty,
    /// More often than not.
    Likely,
    /// Usually.
    VeryLikely,
    /// Almost always.
    NearCertain,
}

impl OddsTier {
    /// Every tier, from least to most likely.
    pub const ALL: [Self; 7] = [
        Self::Impossible,
        Self::VeryUnlikely,
        Self::Unlikely,
        Self::FiftyFifty,
        Self::Likely,
        Self::VeryLikely,
        Self::NearCertain,
    ];

    /// Position in [`Self::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Label shown to players.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Impossible => "Impossible",
            Self::VeryUnlikely => "Very Unlikely",
            Self::Unlikely => "Unlikely",
            Self::FiftyFifty => "50/50",
            Self::Likely => "Likely",
            Self::VeryLikely => "Very Likely",
            Self::NearCertain => "Near Certain",
        }
    }
}

/// Result of a fortune roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FortuneOutcome {
    /// Yes, and more than asked for.
    ExceptionalYes,
    /// Yes.
    Yes,
    /// No.
    No,
    /// No, and worse than feared.
    ExceptionalNo,
}

impl FortuneOutcome {
    /// Exceptional results make the beat major.
    #[must_use]
    pub fn is_exceptional(self) -> bool {
        matches!(self, Self::ExceptionalYes | Self::ExceptionalNo)
    }

    /// Label shown to players.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::ExceptionalYes => "Exceptional Yes",
            Self::Yes => "Yes",
            Self::No => "No",
            Self::ExceptionalNo => "Exceptional No",
        }
    }
}

/// A yes/no question resolved against the fortune table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FortuneRoll {
    /// Event identifier.
    pub id: Uuid,
    /// The beat the roll belongs to.
    pub beat_id: Uuid,
    /// Scene the roll was made in.
    pub scene_id: Uuid,
    /// Who asked.
    pub invoker_id: Uuid,
    /// The question.
    pub question: String,
    /// Declared odds.
    pub odds: OddsTier,
    /// Scene tension captured when the roll was made.
    pub tension: Tension,
    /// Outcome; `None` while the contest window is open.
    pub result: Option<FortuneOutcome>,
    /// End of the contest window.
    pub expires_at: DateTime<Utc>,
    /// A contested roll never resolves on its own.
    pub contested: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl FortuneRoll {
    /// Returns `true` until a result is recorded.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.result.is_none()
    }

    /// Returns `true` once the roll should resolve on read.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && !self.contested && now >= self.expires_at
    }
}
