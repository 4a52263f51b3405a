//! Command handlers for the oracle context.

use loom_core::changeset::{Guard, Write};
use loom_core::context::EngineContext;
use loom_core::error::{ConflictKind, DomainError};
use loom_core::gateway::{ProposalDraft, ProposalGateway, ProposalOutcome};
use loom_core::model::{
    Beat, BeatEvent, BeatStatus, OracleComment, OracleEvent, OracleType, OracleVote,
    ProposalSubject, Scene, Significance,
};
use loom_core::notification::{Notification, NotificationKind, excerpt, scene_link};
use loom_narrative::application::command_handlers::{draft_beat, ensure_scene_active};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::commands::{
    CommentOnOracle, InvokeOracle, SelectInterpretation, VoteOnInterpretation,
};
use crate::domain::selection::{self, Choice};
use crate::domain::word_seeds::{self, BUILTIN_TABLES};

/// Result of invoking an oracle.
#[derive(Debug, Clone, Serialize)]
pub struct OracleInvocation {
    /// The beat holding the oracle.
    pub beat: Beat,
    /// The oracle with its interpretations.
    pub oracle: OracleEvent,
    /// The vote a major beat went to.
    pub proposal: Option<ProposalOutcome>,
}

fn ensure_open(oracle: &OracleEvent) -> Result<(), DomainError> {
    if oracle.is_finalized() {
        Err(DomainError::invalid_state(
            "an interpretation has already been selected",
        ))
    } else {
        Ok(())
    }
}

// The scene question and its canon prose so far, as generation context.
fn scene_context(scene: &Scene, beats: &[&Beat]) -> String {
    let mut context = format!("Scene: {}", scene.guiding_question);
    for beat in beats.iter().filter(|b| b.status == BeatStatus::Canon) {
        let prose = beat.prose();
        if !prose.is_empty() {
            context.push('\n');
            context.push_str(&prose);
        }
    }
    context
}

/// Handles the `InvokeOracle` command.
///
/// Draws word seeds when none are given, asks the assistant for three
/// interpretations (an empty list if it fails) and records the oracle on a
/// new beat. Major beats go to a vote.
///
/// # Errors
///
/// `Forbidden` for non-members, `InvalidState` unless the game and scene are
/// active, `Validation` for a blank question.
pub async fn handle_invoke_oracle(
    command: &InvokeOracle,
    ctx: &EngineContext<'_>,
    proposals: &dyn ProposalGateway,
) -> Result<OracleInvocation, DomainError> {
    let mut uow = ctx.begin(command).await?;
    let game = uow.arena().game().clone();
    game.ensure_member(command.actor_id)?;
    game.ensure_active()?;
    let scene = uow.arena().scene(command.scene_id)?.clone();
    ensure_scene_active(&scene)?;

    let question = command.question.trim().to_owned();
    if question.is_empty() {
        return Err(DomainError::validation("oracle question is required"));
    }
    let seeds = match &command.word_seeds {
        Some(pair) => pair.clone(),
        None => ctx.with_rng(|rng| word_seeds::random_pair(&BUILTIN_TABLES, rng))?,
    };

    let context = scene_context(&scene, &uow.arena().beats_of(scene.id));
    let interpretations = match ctx
        .assistant
        .generate_interpretations(&question, Some(&seeds), &context)
        .await
    {
        Ok(readings) => readings.to_vec(),
        Err(e) => {
            warn!(game_id = %game.id, error = %e, "interpretation generation failed");
            Vec::new()
        }
    };

    let oracle_id = Uuid::new_v4();
    let significance = command.significance.unwrap_or(Significance::Minor);
    let order = uow.arena().next_beat_order(scene.id);
    let beat = draft_beat(
        ctx,
        &scene,
        order,
        command.actor_id,
        significance,
        vec![BeatEvent::Oracle { oracle_id }],
    );
    let beat_id = beat.id;
    let oracle = OracleEvent {
        id: oracle_id,
        beat_id,
        scene_id: scene.id,
        invoker_id: command.actor_id,
        oracle_type: command.oracle_type,
        question,
        word_seeds: Some(seeds),
        interpretations,
        selected_interpretation: None,
        created_at: ctx.clock.now(),
    };
    uow.stage(Write::Beat(beat))?;
    uow.stage(Write::Oracle(oracle.clone()))?;

    let (beat, proposal) = match significance {
        Significance::Major => {
            let outcome = proposals
                .open_proposal(
                    uow,
                    ProposalDraft {
                        subject: ProposalSubject::BeatProposal { beat_id },
                        proposer_id: Some(command.actor_id),
                        expires_at: Some(ctx.clock.hours_from_now(game.settings.silence_timer_hours)),
                    },
                )
                .await?;
            (outcome.arena.beat(beat_id)?.clone(), Some(outcome))
        }
        Significance::Minor => {
            let arena = uow.commit(ctx.store).await?;
            (arena.beat(beat_id)?.clone(), None)
        }
    };

    ctx.notifier.notify(
        Notification::to_members(
            &game,
            Some(command.actor_id),
            NotificationKind::OracleReady,
            format!("Oracle interpretations are ready: \"{}\"", excerpt(&oracle.question)),
        )
        .with_link(scene_link(game.id, scene.id)),
    );
    info!(
        oracle_id = %oracle.id,
        interpretations = oracle.interpretations.len(),
        "oracle invoked"
    );
    Ok(OracleInvocation {
        beat,
        oracle,
        proposal,
    })
}

/// Handles the `VoteOnInterpretation` command.
///
/// # Errors
///
/// `Forbidden` for non-members, `InvalidState` once an interpretation is
/// selected or for personal oracles, `Validation` for a bad index or an
/// empty custom text, `Conflict(AlreadyVoted)` for a second vote.
pub async fn handle_vote_on_interpretation(
    command: &VoteOnInterpretation,
    ctx: &EngineContext<'_>,
) -> Result<OracleVote, DomainError> {
    let mut uow = ctx.begin(command).await?;
    uow.arena().game().ensure_member(command.actor_id)?;
    let oracle = uow.arena().oracle(command.oracle_id)?.clone();
    ensure_open(&oracle)?;
    if oracle.oracle_type == OracleType::Personal {
        return Err(DomainError::invalid_state(
            "personal oracles are decided by the invoker",
        ));
    }
    let choice = Choice::parse(
        &oracle,
        command.interpretation_index,
        command.custom_text.as_deref(),
        false,
    )?;
    uow.guard(Guard::OracleUnselected(oracle.id))?;

    let vote = OracleVote {
        id: Uuid::new_v4(),
        oracle_id: oracle.id,
        voter_id: command.actor_id,
        interpretation_index: choice.stored_index(),
        custom_text: match choice {
            Choice::Custom(text) => Some(text),
            Choice::Index(_) | Choice::TieBreak => None,
        },
        cast_at: ctx.clock.now(),
    };
    uow.stage(Write::OracleVote(vote.clone()))?;
    uow.commit(ctx.store).await?;

    info!(oracle_id = %oracle.id, index = vote.interpretation_index, "oracle vote recorded");
    Ok(vote)
}

/// Handles the `CommentOnOracle` command.
///
/// # Errors
///
/// `Forbidden` for non-members, `Validation` for blank text, `InvalidState`
/// once an interpretation is selected.
pub async fn handle_comment_on_oracle(
    command: &CommentOnOracle,
    ctx: &EngineContext<'_>,
) -> Result<OracleComment, DomainError> {
    let mut uow = ctx.begin(command).await?;
    uow.arena().game().ensure_member(command.actor_id)?;
    let oracle = uow.arena().oracle(command.oracle_id)?.clone();
    let content = command.content.trim();
    if content.is_empty() {
        return Err(DomainError::validation("comment must not be empty"));
    }
    ensure_open(&oracle)?;
    uow.guard(Guard::OracleUnselected(oracle.id))?;

    let comment = OracleComment {
        id: Uuid::new_v4(),
        oracle_id: oracle.id,
        author_id: command.actor_id,
        content: content.to_owned(),
        created_at: ctx.clock.now(),
    };
    uow.stage(Write::OracleComment(comment.clone()))?;
    uow.commit(ctx.store).await?;
    Ok(comment)
}

/// Handles the `SelectInterpretation` command. Selection is write-once.
///
/// # Errors
///
/// `Forbidden` for anyone but the invoker, `Conflict(AlreadyResolved)` if an
/// interpretation was already selected, `Validation` for a bad index, an
/// empty custom text or a tie-break with no votes.
pub async fn handle_select_interpretation(
    command: &SelectInterpretation,
    ctx: &EngineContext<'_>,
) -> Result<OracleEvent, DomainError> {
    let mut uow = ctx.begin(command).await?;
    let game = uow.arena().game().clone();
    let mut oracle = uow.arena().oracle(command.oracle_id)?.clone();
    if oracle.invoker_id != command.actor_id {
        return Err(DomainError::forbidden(
            "only the invoker can select an interpretation",
        ));
    }
    if oracle.is_finalized() {
        return Err(DomainError::Conflict(ConflictKind::AlreadyResolved));
    }
    let choice = Choice::parse(
        &oracle,
        command.interpretation_index,
        command.custom_text.as_deref(),
        true,
    )?;
    uow.guard(Guard::OracleUnselected(oracle.id))?;

    let votes = uow.arena().oracle_votes_on(oracle.id);
    let selected = ctx.with_rng(|rng| {
        selection::resolve(choice, &oracle, &votes, game.settings.tie_breaking_method, rng)
    })??;
    oracle.selected_interpretation = Some(selected);
    uow.stage(Write::Oracle(oracle.clone()))?;
    uow.commit(ctx.store).await?;

    info!(oracle_id = %oracle.id, "interpretation selected");
    Ok(oracle)
}
