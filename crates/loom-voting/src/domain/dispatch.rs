//! Applies an approved proposal to the story.

use loom_core::changeset::{Guard, UnitOfWork, Write};
use loom_core::error::{ConflictKind, DomainError};
use loom_core::model::{ProposalStatus, ProposalSubject};
use loom_narrative::domain::state_machine::{self, FollowUp};
use tracing::debug;
use uuid::Uuid;

use crate::domain::resolution::Verdict;

/// Marks a stored proposal approved and stages the transition its subject
/// names. The proposal must still be open when the changeset commits.
///
/// # Errors
///
/// `Conflict(AlreadyResolved)` if the proposal is no longer open, or any
/// error the state machine reports for the target.
pub fn approve(
    uow: &mut UnitOfWork,
    proposal_id: Uuid,
    verdict: Verdict,
) -> Result<Option<FollowUp>, DomainError> {
    uow.guard(Guard::ProposalOpen(proposal_id))?;
    approve_staged(uow, proposal_id, verdict)
}

/// Like [`approve`], for a proposal staged in the same unit of work. No
/// guard is recorded since the store has not seen the proposal yet.
///
/// # Errors
///
/// `Conflict(AlreadyResolved)` if the proposal is not open, or any error
/// the state machine reports for the target.
pub fn approve_staged(
    uow: &mut UnitOfWork,
    proposal_id: Uuid,
    verdict: Verdict,
) -> Result<Option<FollowUp>, DomainError> {
    let mut proposal = uow.arena().proposal(proposal_id)?.clone();
    if !proposal.is_open() {
        return Err(DomainError::Conflict(ConflictKind::AlreadyResolved));
    }
    proposal.status = ProposalStatus::Approved;
    let subject = proposal.subject.clone();
    uow.stage(Write::Proposal(proposal))?;
    debug!(%proposal_id, proposal_type = subject.proposal_type().as_str(), "applying approved proposal");

    match subject {
        ProposalSubject::WorldDocApproval | ProposalSubject::ReadyToPlay => {
            state_machine::activate_game(uow)?;
            Ok(None)
        }
        ProposalSubject::ActProposal { act_id } => {
            state_machine::activate_act(uow, act_id)?;
            Ok(None)
        }
        ProposalSubject::ActComplete { act_id } => state_machine::complete_act(uow, act_id),
        ProposalSubject::SceneProposal { scene_id } => {
            state_machine::activate_scene(uow, scene_id)?;
            Ok(None)
        }
        ProposalSubject::SceneComplete { scene_id } => state_machine::complete_scene(uow, scene_id),
        ProposalSubject::BeatProposal { beat_id } => {
            state_machine::canonize_beat(uow, beat_id)?;
            Ok(None)
        }
        ProposalSubject::TensionAdjustment {
            scene_id, delta, ..
        } => {
            let applied = verdict.tension_delta().unwrap_or(delta);
            state_machine::apply_tension_delta(uow, scene_id, applied)?;
            Ok(None)
        }
    }
}
