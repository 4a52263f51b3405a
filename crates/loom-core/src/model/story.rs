use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Scene tension, always within `1..=9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Tension(u8);

impl Tension {
    /// Lowest tension.
    pub const MIN: i32 = 1;
    /// Highest tension.
    pub const MAX: i32 = 9;
    /// The baseline every probability table is calibrated at.
    pub const NEUTRAL: Self = Self(5);

    /// Validates a tension value.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `value` is outside `1..=9`.
    pub fn new(value: i32) -> Result<Self, DomainError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self::clamped(value))
        } else {
            Err(DomainError::validation("tension must be between 1 and 9"))
        }
    }

    /// Clamps any integer into range.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn clamped(value: i32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX) as u8)
    }

    /// The raw value.
    #[must_use]
    pub fn get(self) -> i32 {
        i32::from(self.0)
    }

    /// Applies a delta, clamping the result.
    #[must_use]
    pub fn shifted(self, delta: i32) -> Self {
        Self::clamped(self.get().saturating_add(delta))
    }
}

impl TryFrom<i32> for Tension {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Tension> for i32 {
    fn from(tension: Tension) -> Self {
        tension.get()
    }
}

impl fmt::Display for Tension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status shared by acts and scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    /// Awaiting approval.
    Proposed,
    /// Currently being played.
    Active,
    /// Finished.
    Complete,
}

/// An act of the story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Act {
    /// Act identifier.
    pub id: Uuid,
    /// Act title.
    pub title: String,
    /// The question the act explores.
    pub guiding_question: String,
    /// Lifecycle status.
    pub status: StoryStatus,
    /// Position within the game, starting at 1.
    pub order: u32,
    /// Compiled prose, once the act is complete.
    pub narrative: Option<String>,
}

/// A scene within an act.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    /// Scene identifier.
    pub id: Uuid,
    /// Owning act.
    pub act_id: Uuid,
    /// The question the scene explores.
    pub guiding_question: String,
    /// Where the scene takes place.
    pub location: Option<String>,
    /// Lifecycle status.
    pub status: StoryStatus,
    /// Position within the act, starting at 1.
    pub order: u32,
    /// Current tension.
    pub tension: Tension,
    /// Tension agreed at completion, inherited by the next scene.
    pub tension_carry_forward: Option<Tension>,
    /// Compiled prose, once the scene is complete.
    pub narrative: Option<String>,
}

/// Weight of a beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    /// Becomes canon immediately.
    Minor,
    /// Needs group approval.
    Major,
}

/// Lifecycle of a beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatStatus {
    /// Awaiting a vote or a fortune roll.
    Proposed,
    /// Approved but not yet folded into canon.
    Approved,
    /// Part of the story.
    Canon,
    /// Disputed by a member.
    Challenged,
    /// Superseded by a revision.
    Revised,
    /// Rejected by the group.
    Rejected,
}

impl BeatStatus {
    /// Lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Approved => "approved",
            Self::Canon => "canon",
            Self::Challenged => "challenged",
            Self::Revised => "revised",
            Self::Rejected => "rejected",
        }
    }
}

/// How the author answered a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeOutcome {
    /// The author revised the beat.
    AcceptedRevision,
    /// The author kept the beat as it was.
    Dismissed,
}

/// One entry of a beat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BeatEvent {
    /// In-fiction prose.
    Narrative {
        /// The prose.
        content: String,
    },
    /// Out-of-character note.
    Ooc {
        /// The note.
        content: String,
    },
    /// A dice roll made with the beat.
    Roll {
        /// Dice notation as entered.
        notation: String,
        /// Rolled total.
        result: i64,
        /// Why the dice were rolled.
        reason: Option<String>,
    },
    /// An oracle invocation.
    Oracle {
        /// The oracle event.
        oracle_id: Uuid,
    },
    /// A fortune roll.
    FortuneRoll {
        /// The fortune roll event.
        roll_id: Uuid,
    },
}

/// An atomic narrative contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beat {
    /// Beat identifier.
    pub id: Uuid,
    /// Owning scene.
    pub scene_id: Uuid,
    /// The member who wrote it.
    pub author_id: Uuid,
    /// Position within the scene, starting at 1.
    pub order: u32,
    /// Minor or major.
    pub significance: Significance,
    /// Lifecycle status.
    pub status: BeatStatus,
    /// Ordered contents.
    pub events: Vec<BeatEvent>,
    /// Reason given by the most recent challenger.
    pub challenge_reason: Option<String>,
    /// Most recent challenger.
    pub challenged_by_id: Option<Uuid>,
    /// How the most recent challenge ended.
    pub challenge_outcome: Option<ChallengeOutcome>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

impl Beat {
    /// Concatenated in-fiction prose, used for classification and synthesis.
    #[must_use]
    pub fn prose(&self) -> String {
        self.events
            .iter()
            .filter_map(|event| match event {
                BeatEvent::Narrative { content } => Some(content.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Discussion on a challenged beat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatComment {
    /// Comment identifier.
    pub id: Uuid,
    /// The beat under discussion.
    pub beat_id: Uuid,
    /// The commenter.
    pub author_id: Uuid,
    /// Comment text.
    pub content: String,
    /// Posting time.
    pub created_at: DateTime<Utc>,
}
