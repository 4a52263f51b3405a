use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Interpretation index meaning "custom text".
pub const CUSTOM_INTERPRETATION: i32 = -1;

/// Selection index asking for tie-break resolution.
pub const TIE_BREAK_REQUEST: i32 = -2;

/// Whose story an oracle answer affects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleType {
    /// Only the invoker's character; the invoker decides alone.
    Personal,
    /// The shared fiction; members vote on interpretations.
    #[default]
    World,
}

/// Two prompt words drawn from the seed tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPair {
    /// A verb.
    pub action: String,
    /// A noun or adjective.
    pub descriptor: String,
}

/// An oracle invocation and its interpretations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleEvent {
    /// Event identifier.
    pub id: Uuid,
    /// The beat the oracle belongs to.
    pub beat_id: Uuid,
    /// Scene the oracle was invoked in.
    pub scene_id: Uuid,
    /// Who asked.
    pub invoker_id: Uuid,
    /// Personal or world.
    pub oracle_type: OracleType,
    /// The question.
    pub question: String,
    /// Prompt words.
    pub word_seeds: Option<WordPair>,
    /// Generated interpretations; empty if generation failed.
    pub interpretations: Vec<String>,
    /// Final interpretation. Write-once.
    pub selected_interpretation: Option<String>,
    /// Invocation time.
    pub created_at: DateTime<Utc>,
}

impl OracleEvent {
    /// Returns `true` once an interpretation has been chosen.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.selected_interpretation.is_some()
    }
}

/// One member's preferred interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleVote {
    /// Vote identifier.
    pub id: Uuid,
    /// The oracle voted on.
    pub oracle_id: Uuid,
    /// The voter.
    pub voter_id: Uuid,
    /// Index into the interpretations, or [`CUSTOM_INTERPRETATION`].
    pub interpretation_index: i32,
    /// Text of a custom interpretation.
    pub custom_text: Option<String>,
    /// When the vote was recorded.
    pub cast_at: DateTime<Utc>,
}

/// Discussion on an oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleComment {
    /// Comment identifier.
    pub id: Uuid,
    /// The oracle under discussion.
    pub oracle_id: Uuid,
    /// The commenter.
    pub author_id: Uuid,
    /// Comment text.
    pub content: String,
    /// Posting time.
    pub created_at: DateTime<Utc>,
}
