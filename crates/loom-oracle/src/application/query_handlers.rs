//! Query handlers for the oracle context.

use loom_core::arena::GameArena;
use loom_core::error::DomainError;
use loom_core::model::{CUSTOM_INTERPRETATION, OracleComment, OracleEvent, OracleVote};
use loom_core::repository::NarrativeStore;
use serde::Serialize;
use uuid::Uuid;

/// Votes gathered by one interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterpretationTally {
    /// Position among the interpretations.
    pub index: usize,
    /// The interpretation.
    pub text: String,
    /// Votes for it.
    pub votes: usize,
}

/// An oracle with its discussion and vote counts.
#[derive(Debug, Clone, Serialize)]
pub struct OracleView {
    /// The oracle.
    #[serde(flatten)]
    pub oracle: OracleEvent,
    /// One entry per generated interpretation.
    pub tallies: Vec<InterpretationTally>,
    /// Custom interpretations proposed by voters.
    pub custom_votes: Vec<OracleVote>,
    /// Discussion, oldest first.
    pub comments: Vec<OracleComment>,
}

/// Builds the view of one oracle.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the oracle is missing.
pub fn oracle_view(arena: &GameArena, oracle_id: Uuid) -> Result<OracleView, DomainError> {
    let oracle = arena.oracle(oracle_id)?.clone();
    let votes = arena.oracle_votes_on(oracle_id);
    let tallies = oracle
        .interpretations
        .iter()
        .enumerate()
        .map(|(index, text)| InterpretationTally {
            index,
            text: text.clone(),
            votes: votes
                .iter()
                .filter(|vote| usize::try_from(vote.interpretation_index).ok() == Some(index))
                .count(),
        })
        .collect();
    let custom_votes = votes
        .into_iter()
        .filter(|vote| vote.interpretation_index == CUSTOM_INTERPRETATION)
        .cloned()
        .collect();
    Ok(OracleView {
        oracle,
        tallies,
        custom_votes,
        comments: arena.comments_on_oracle(oracle_id).into_iter().cloned().collect(),
    })
}

/// Retrieves one oracle.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the game or oracle does not exist.
pub async fn get_oracle_view(
    game_id: Uuid,
    oracle_id: Uuid,
    store: &dyn NarrativeStore,
) -> Result<OracleView, DomainError> {
    let arena = store.load_arena(game_id).await?;
    oracle_view(&arena, oracle_id)
}

#[cfg(test)]
mod tests {
    use loom_core::model::OracleType;
    use loom_test_support::{Harness, OpenOnlyGateway};

    use super::*;
    use crate::application::command_handlers::{handle_invoke_oracle, handle_vote_on_interpretation};
    use crate::domain::commands::{InvokeOracle, VoteOnInterpretation};

    #[tokio::test]
    async fn test_view_counts_votes_per_interpretation() {
        // Arrange
        let harness = Harness::new();
        let game = harness.game(3).await;
        let (_, scene) = harness.active_scene(&game).await;
        let gateway = OpenOnlyGateway::new(&harness.store);
        let invocation = handle_invoke_oracle(
            &InvokeOracle {
                correlation_id: Uuid::new_v4(),
                game_id: game.id,
                actor_id: game.members[0],
                scene_id: scene.id,
                question: "What sank the ferry?".to_owned(),
                oracle_type: OracleType::World,
                word_seeds: None,
                significance: None,
            },
            &harness.ctx(),
            &gateway,
        )
        .await
        .unwrap();
        for (member, index, text) in [
            (game.members[0], 2, None),
            (game.members[1], 2, None),
            (game.members[2], -1, Some("A reef that was not on the charts.".to_owned())),
        ] {
            handle_vote_on_interpretation(
                &VoteOnInterpretation {
                    correlation_id: Uuid::new_v4(),
                    game_id: game.id,
                    actor_id: member,
                    oracle_id: invocation.oracle.id,
                    interpretation_index: index,
                    custom_text: text,
                },
                &harness.ctx(),
            )
            .await
            .unwrap();
        }

        // Act
        let view = get_oracle_view(game.id, invocation.oracle.id, &harness.store)
            .await
            .unwrap();

        // Assert
        let counts: Vec<usize> = view.tallies.iter().map(|t| t.votes).collect();
        assert_eq!(counts, vec![0, 0, 2]);
        assert_eq!(view.custom_votes.len(), 1);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["question"], "What sank the ferry?");
    }
}
