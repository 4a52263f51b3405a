//! Commands for the oracle context.

use loom_core::command::Command;
use loom_core::model::{OracleType, Significance, WordPair};
use uuid::Uuid;

macro_rules! oracle_command {
    ($name:ident, $type_name:literal) => {
        impl Command for $name {
            fn command_type(&self) -> &'static str {
                $type_name
            }

            fn correlation_id(&self) -> Uuid {
                self.correlation_id
            }

            fn game_id(&self) -> Uuid {
                self.game_id
            }
        }
    };
}

/// Command to ask the oracle an open question.
#[derive(Debug, Clone)]
pub struct InvokeOracle {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game the oracle belongs to.
    pub game_id: Uuid,
    /// The asking member.
    pub actor_id: Uuid,
    /// The active scene to invoke in.
    pub scene_id: Uuid,
    /// The question.
    pub question: String,
    /// Personal or world.
    pub oracle_type: OracleType,
    /// Prompt words; drawn from the built-in tables when absent.
    pub word_seeds: Option<WordPair>,
    /// Weight of the resulting beat; minor when absent.
    pub significance: Option<Significance>,
}

oracle_command!(InvokeOracle, "oracle.invoke");

/// Command to vote for an interpretation.
#[derive(Debug, Clone)]
pub struct VoteOnInterpretation {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game the oracle belongs to.
    pub game_id: Uuid,
    /// The voting member.
    pub actor_id: Uuid,
    /// The oracle voted on.
    pub oracle_id: Uuid,
    /// Interpretation index, or `-1` for custom text.
    pub interpretation_index: i32,
    /// Custom interpretation text.
    pub custom_text: Option<String>,
}

oracle_command!(VoteOnInterpretation, "oracle.vote");

/// Command to discuss an oracle before selection.
#[derive(Debug, Clone)]
pub struct CommentOnOracle {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game the oracle belongs to.
    pub game_id: Uuid,
    /// The commenting member.
    pub actor_id: Uuid,
    /// The oracle under discussion.
    pub oracle_id: Uuid,
    /// Comment text.
    pub content: String,
}

oracle_command!(CommentOnOracle, "oracle.comment");

/// Command for the invoker to settle an oracle.
#[derive(Debug, Clone)]
pub struct SelectInterpretation {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game the oracle belongs to.
    pub game_id: Uuid,
    /// The invoker.
    pub actor_id: Uuid,
    /// The oracle to settle.
    pub oracle_id: Uuid,
    /// Interpretation index, `-1` for custom text or `-2` for a tie-break.
    pub interpretation_index: i32,
    /// Custom interpretation text.
    pub custom_text: Option<String>,
}

oracle_command!(SelectInterpretation, "oracle.select");
