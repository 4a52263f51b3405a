//! When a proposal is decided.

use chrono::{DateTime, Utc};
use loom_core::arena::GameArena;
use loom_core::model::{Proposal, ProposalSubject, VoteTally};

use crate::domain::threshold::is_approved;
use crate::domain::tie_break::resolve_tension_vote;

/// What the votes on a proposal amount to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Still collecting votes.
    Open,
    /// Approved by majority or by silence.
    Approve,
    /// A tension vote settled on a delta.
    SettleTension {
        /// Delta to apply to the scene.
        delta: i32,
    },
}

impl Verdict {
    /// Returns `true` unless the proposal stays open.
    #[must_use]
    pub fn is_resolved(self) -> bool {
        self != Self::Open
    }

    /// The delta a tension vote settled on.
    #[must_use]
    pub fn tension_delta(self) -> Option<i32> {
        match self {
            Self::SettleTension { delta } => Some(delta),
            Self::Open | Self::Approve => None,
        }
    }
}

fn plurality(tally: VoteTally, ai_delta: i32) -> Verdict {
    Verdict::SettleTension {
        delta: resolve_tension_vote(tally.yes, tally.suggest, tally.no, ai_delta),
    }
}

/// Evaluates the votes recorded on an open proposal.
///
/// Tension adjustments resolve only once every participant has voted, by
/// plurality; everything else needs a strict majority of yes votes.
#[must_use]
pub fn evaluate(arena: &GameArena, proposal: &Proposal) -> Verdict {
    if !proposal.is_open() {
        return Verdict::Open;
    }
    let participants = arena.game().participant_count();
    let tally = VoteTally::count(arena.votes_on(proposal.id));
    match &proposal.subject {
        ProposalSubject::TensionAdjustment { delta, .. } => {
            if participants > 0 && tally.total() >= participants {
                plurality(tally, *delta)
            } else {
                Verdict::Open
            }
        }
        _ if is_approved(tally.yes, participants) => Verdict::Approve,
        _ => Verdict::Open,
    }
}

/// Evaluates an open proposal whose silence timer may have run out. Beat
/// proposals pass on silence; tension votes settle on the votes cast so far.
#[must_use]
pub fn evaluate_expired(arena: &GameArena, proposal: &Proposal, now: DateTime<Utc>) -> Verdict {
    if !proposal.is_expired(now) {
        return Verdict::Open;
    }
    match &proposal.subject {
        ProposalSubject::BeatProposal { .. } => Verdict::Approve,
        ProposalSubject::TensionAdjustment { delta, .. } => {
            plurality(VoteTally::count(arena.votes_on(proposal.id)), *delta)
        }
        ProposalSubject::WorldDocApproval
        | ProposalSubject::ReadyToPlay
        | ProposalSubject::ActProposal { .. }
        | ProposalSubject::ActComplete { .. }
        | ProposalSubject::SceneProposal { .. }
        | ProposalSubject::SceneComplete { .. } => Verdict::Open,
    }
}
