//! Commands for the fortune context.

use loom_core::command::Command;
use loom_core::model::OddsTier;
use uuid::Uuid;

macro_rules! fortune_command {
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

/// Command to ask the fortune table a question.
#[derive(Debug, Clone)]
pub struct SubmitFortuneRoll {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game the roll belongs to.
    pub game_id: Uuid,
    /// The asking member.
    pub actor_id: Uuid,
    /// The active scene to roll in.
    pub scene_id: Uuid,
    /// The yes/no question.
    pub question: String,
    /// Declared odds.
    pub odds: OddsTier,
}

fortune_command!(SubmitFortuneRoll, "fortune.submit_roll");

/// Command to halt a pending roll's contest window.
#[derive(Debug, Clone)]
pub struct ContestFortuneRoll {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game the roll belongs to.
    pub game_id: Uuid,
    /// The contesting member.
    pub actor_id: Uuid,
    /// The roll to contest.
    pub roll_id: Uuid,
}

fortune_command!(ContestFortuneRoll, "fortune.contest_roll");

/// Command for the invoker to stand by a contested roll.
#[derive(Debug, Clone)]
pub struct ReaffirmFortuneRoll {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game the roll belongs to.
    pub game_id: Uuid,
    /// The invoker.
    pub actor_id: Uuid,
    /// The contested roll.
    pub roll_id: Uuid,
}

fortune_command!(ReaffirmFortuneRoll, "fortune.reaffirm_roll");
