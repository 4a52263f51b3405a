//! Commands for the voting context.

use loom_core::command::Command;
use loom_core::model::{ProposalSubject, VoteChoice};
use serde::Deserialize;
use uuid::Uuid;

/// Command to vote on an open proposal.
#[derive(Debug, Clone)]
pub struct CastVote {
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game.
    pub game_id: Uuid,
    /// The voter.
    pub actor_id: Uuid,
    /// The proposal voted on.
    pub proposal_id: Uuid,
    /// The choice.
    pub choice: VoteChoice,
    /// Suggested change accompanying a suggest-modification vote.
    pub suggestion: Option<String>,
}

impl Command for CastVote {
    fn command_type(&self) -> &'static str {
        "voting.cast_vote"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn game_id(&self) -> Uuid {
        self.game_id
    }
}

/// Which setup milestone starts play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStartKind {
    /// Approve the world document.
    WorldDocApproval,
    /// Declare the group ready.
    ReadyToPlay,
}

impl From<GameStartKind> for ProposalSubject {
    fn from(kind: GameStartKind) -> Self {
        match kind {
            GameStartKind::WorldDocApproval => Self::WorldDocApproval,
            GameStartKind::ReadyToPlay => Self::ReadyToPlay,
        }
    }
}

/// Command to propose starting play.
#[derive(Debug, Clone)]
pub struct ProposeGameStart {
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game.
    pub game_id: Uuid,
    /// The proposer.
    pub actor_id: Uuid,
    /// Which milestone.
    pub kind: GameStartKind,
}

impl Command for ProposeGameStart {
    fn command_type(&self) -> &'static str {
        "voting.propose_game_start"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn game_id(&self) -> Uuid {
        self.game_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_types_are_namespaced() {
        let vote = CastVote {
            correlation_id: Uuid::new_v4(),
            game_id: Uuid::new_v4(),
            actor_id: Uuid::new_v4(),
            proposal_id: Uuid::new_v4(),
            choice: VoteChoice::Yes,
            suggestion: None,
        };
        assert_eq!(vote.command_type(), "voting.cast_vote");
        assert_eq!(vote.game_id(), vote.game_id);
    }

    #[test]
    fn test_game_start_kind_maps_to_subject() {
        assert_eq!(
            ProposalSubject::from(GameStartKind::ReadyToPlay),
            ProposalSubject::ReadyToPlay
        );
    }
}
