//! Command handlers for the voting context.

use loom_core::arena::GameArena;
use loom_core::changeset::{Guard, Write};
use loom_core::context::EngineContext;
use loom_core::error::DomainError;
use loom_core::gateway::{ProposalDraft, ProposalGateway, ProposalOutcome};
use loom_core::model::{GameStatus, ProposalType, Vote, VoteChoice};
use loom_narrative::application::query_handlers::ProposalView;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::engine::{ApprovalTrigger, VotingEngine};
use crate::domain::commands::{CastVote, ProposeGameStart};
use crate::domain::resolution;

/// Result of casting a vote.
#[derive(Debug, Serialize)]
pub struct VoteOutcome {
    /// The recorded vote.
    pub vote: Vote,
    /// The proposal after the vote.
    pub proposal: ProposalView,
    /// `true` if this vote resolved the proposal.
    pub resolved: bool,
}

/// Handles the `CastVote` command.
///
/// The vote is committed first. The proposal is then judged on a fresh read
/// of the committed votes, so whichever of several concurrent voters commits
/// last sees every vote. The approval commits separately under a guard; a
/// request that loses the race to resolve keeps its vote and reports
/// `resolved = false`, as does one whose approval fails after the vote landed.
///
/// # Errors
///
/// `Forbidden` for non-members, `InvalidState` if the proposal is closed,
/// `Conflict(AlreadyVoted)` for a second vote by the same member.
pub async fn handle_cast_vote(
    command: &CastVote,
    ctx: &EngineContext<'_>,
) -> Result<VoteOutcome, DomainError> {
    let mut uow = ctx.begin(command).await?;
    let game = uow.arena().game().clone();
    game.ensure_member(command.actor_id)?;
    let proposal = uow.arena().proposal(command.proposal_id)?.clone();
    if !proposal.is_open() {
        return Err(DomainError::invalid_state("proposal is no longer open"));
    }
    uow.guard(Guard::ProposalOpen(proposal.id))?;

    let vote = Vote {
        id: Uuid::new_v4(),
        proposal_id: proposal.id,
        voter_id: command.actor_id,
        choice: command.choice,
        suggestion: command
            .suggestion
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned),
        cast_at: ctx.clock.now(),
    };
    uow.stage(Write::Vote(vote.clone()))?;
    if command.choice == VoteChoice::SuggestModification
        && proposal.proposal_type() == ProposalType::BeatProposal
    {
        let mut extended = proposal.clone();
        extended.expires_at = Some(ctx.clock.hours_from_now(game.settings.silence_timer_hours));
        uow.stage(Write::Proposal(extended))?;
    }
    let committed = uow.commit(ctx.store).await?;
    info!(proposal_id = %proposal.id, choice = ?vote.choice, "vote recorded");

    let (arena, resolved) = match settle_after_vote(ctx, game.id, proposal.id).await {
        Ok(settled) => settled,
        Err(e) => {
            warn!(
                proposal_id = %proposal.id,
                error = %e,
                "vote recorded but the proposal could not be settled"
            );
            (committed, false)
        }
    };

    Ok(VoteOutcome {
        vote,
        proposal: ProposalView::from_arena(&arena, arena.proposal(proposal.id)?),
        resolved,
    })
}

/// Re-reads the game and settles the proposal if its committed votes now
/// decide it. Returns the latest arena and whether this call approved it.
async fn settle_after_vote(
    ctx: &EngineContext<'_>,
    game_id: Uuid,
    proposal_id: Uuid,
) -> Result<(GameArena, bool), DomainError> {
    let arena = ctx.store.load_arena(game_id).await?;
    let verdict = resolution::evaluate(&arena, arena.proposal(proposal_id)?);
    if !verdict.is_resolved() {
        return Ok((arena, false));
    }
    match VotingEngine::new(*ctx)
        .settle(arena, proposal_id, verdict, ApprovalTrigger::Votes)
        .await?
    {
        Some(arena) => Ok((arena, true)),
        None => Ok((ctx.store.load_arena(game_id).await?, false)),
    }
}

/// Settles every open proposal of a game that is due: its silence timer has
/// run out, or its committed votes already decide it (a vote whose own
/// settlement failed). Returns the ids of the proposals it approved.
///
/// A proposal that fails to settle is logged and left open.
///
/// # Errors
///
/// Returns `NotFound` for an unknown game, or the store's error on load.
pub async fn resolve_due_proposals(
    game_id: Uuid,
    ctx: &EngineContext<'_>,
) -> Result<Vec<Uuid>, DomainError> {
    let mut arena = ctx.store.load_arena(game_id).await?;
    let now = ctx.clock.now();
    let due: Vec<_> = arena
        .proposals()
        .into_iter()
        .filter_map(|proposal| {
            let by_votes = resolution::evaluate(&arena, proposal);
            if by_votes.is_resolved() {
                return Some((proposal.id, by_votes, ApprovalTrigger::Votes));
            }
            let by_silence = resolution::evaluate_expired(&arena, proposal, now);
            by_silence
                .is_resolved()
                .then_some((proposal.id, by_silence, ApprovalTrigger::Silence))
        })
        .collect();
    if due.is_empty() {
        return Ok(Vec::new());
    }

    let engine = VotingEngine::new(*ctx);
    let mut resolved = Vec::with_capacity(due.len());
    for (proposal_id, verdict, trigger) in due {
        match engine
            .settle(arena.clone(), proposal_id, verdict, trigger)
            .await
        {
            Ok(Some(next)) => {
                arena = next;
                resolved.push(proposal_id);
            }
            Ok(None) => {}
            Err(e) => warn!(%proposal_id, error = %e, "due proposal could not be settled"),
        }
    }
    info!(%game_id, count = resolved.len(), "due proposals resolved");
    Ok(resolved)
}

/// Handles the `ProposeGameStart` command.
///
/// # Errors
///
/// `Forbidden` for non-members, `InvalidState` once play has started,
/// `Conflict` if the same milestone is already pending.
pub async fn handle_propose_game_start(
    command: &ProposeGameStart,
    ctx: &EngineContext<'_>,
) -> Result<ProposalOutcome, DomainError> {
    let uow = ctx.begin(command).await?;
    let game = uow.arena().game();
    game.ensure_member(command.actor_id)?;
    if game.status != GameStatus::Setup {
        return Err(DomainError::invalid_state(
            "play can only be started from setup",
        ));
    }

    VotingEngine::new(*ctx)
        .open_proposal(
            uow,
            ProposalDraft {
                subject: command.kind.into(),
                proposer_id: Some(command.actor_id),
                expires_at: None,
            },
        )
        .await
}
