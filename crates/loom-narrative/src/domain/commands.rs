//! Commands for the narrative context.

use loom_core::command::Command;
use loom_core::model::{GameSettings, Significance};
use serde::Deserialize;
use uuid::Uuid;

macro_rules! narrative_command {
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

/// Command to propose a new act.
#[derive(Debug, Clone)]
pub struct ProposeAct {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game the act belongs to.
    pub game_id: Uuid,
    /// The proposing member.
    pub actor_id: Uuid,
    /// Optional title; blank titles are numbered.
    pub title: String,
    /// The question the act explores.
    pub guiding_question: String,
}

narrative_command!(ProposeAct, "narrative.propose_act");

/// Command to propose a new scene in an active act.
#[derive(Debug, Clone)]
pub struct ProposeScene {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game the scene belongs to.
    pub game_id: Uuid,
    /// The proposing member.
    pub actor_id: Uuid,
    /// The act the scene belongs to.
    pub act_id: Uuid,
    /// The question the scene explores.
    pub guiding_question: String,
    /// Where the scene takes place.
    pub location: Option<String>,
    /// Starting tension; defaults to the carried-forward tension.
    pub tension: Option<i32>,
}

narrative_command!(ProposeScene, "narrative.propose_scene");

/// Command to propose finishing the active act.
#[derive(Debug, Clone)]
pub struct ProposeActComplete {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game the act belongs to.
    pub game_id: Uuid,
    /// The proposing member.
    pub actor_id: Uuid,
    /// The act to finish.
    pub act_id: Uuid,
}

narrative_command!(ProposeActComplete, "narrative.propose_act_complete");

/// Command to propose finishing the active scene.
#[derive(Debug, Clone)]
pub struct ProposeSceneComplete {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game the scene belongs to.
    pub game_id: Uuid,
    /// The proposing member.
    pub actor_id: Uuid,
    /// The scene to finish.
    pub scene_id: Uuid,
}

narrative_command!(ProposeSceneComplete, "narrative.propose_scene_complete");

/// One entry of a beat as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BeatEventInput {
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
    /// Dice to roll server-side.
    Roll {
        /// Dice notation.
        notation: String,
        /// Why the dice are rolled.
        #[serde(default)]
        reason: Option<String>,
    },
}

/// Command to add a beat to the active scene.
#[derive(Debug, Clone)]
pub struct SubmitBeat {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game the beat belongs to.
    pub game_id: Uuid,
    /// The author.
    pub actor_id: Uuid,
    /// The scene the beat belongs to.
    pub scene_id: Uuid,
    /// Contents, in order.
    pub events: Vec<BeatEventInput>,
    /// Explicit significance; classified when absent.
    pub significance: Option<Significance>,
}

narrative_command!(SubmitBeat, "narrative.submit_beat");

/// Command to dispute a canon beat.
#[derive(Debug, Clone)]
pub struct ChallengeBeat {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game the beat belongs to.
    pub game_id: Uuid,
    /// The challenging member.
    pub actor_id: Uuid,
    /// The beat.
    pub beat_id: Uuid,
    /// Why the beat is disputed.
    pub reason: String,
}

narrative_command!(ChallengeBeat, "narrative.challenge_beat");

/// Command for the author to accept a challenge with revised prose.
#[derive(Debug, Clone)]
pub struct AcceptChallenge {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game the beat belongs to.
    pub game_id: Uuid,
    /// The author.
    pub actor_id: Uuid,
    /// The beat.
    pub beat_id: Uuid,
    /// Replacement prose.
    pub revised_content: String,
}

narrative_command!(AcceptChallenge, "narrative.accept_challenge");

/// Command for the author to keep a challenged beat as it was.
#[derive(Debug, Clone)]
pub struct DismissChallenge {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game the beat belongs to.
    pub game_id: Uuid,
    /// The author.
    pub actor_id: Uuid,
    /// The beat.
    pub beat_id: Uuid,
}

narrative_command!(DismissChallenge, "narrative.dismiss_challenge");

/// Command to discuss a challenged beat.
#[derive(Debug, Clone)]
pub struct CommentOnBeat {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game the beat belongs to.
    pub game_id: Uuid,
    /// The commenter.
    pub actor_id: Uuid,
    /// The beat.
    pub beat_id: Uuid,
    /// Comment text.
    pub content: String,
}

narrative_command!(CommentOnBeat, "narrative.comment_on_beat");

/// Command to start a new game in setup.
#[derive(Debug, Clone)]
pub struct CreateGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Identifier for the new game.
    pub game_id: Uuid,
    /// Display name.
    pub name: String,
    /// Participants, in join order.
    pub members: Vec<Uuid>,
    /// Decision policy.
    pub settings: GameSettings,
}

narrative_command!(CreateGame, "narrative.create_game");
