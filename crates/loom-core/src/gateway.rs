//! The seam through which narrative, fortune and oracle commands open
//! proposals without depending on the voting engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::arena::GameArena;
use crate::changeset::UnitOfWork;
use crate::error::DomainError;
use crate::model::{Proposal, ProposalSubject};

/// A proposal about to be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalDraft {
    /// What is to be decided.
    pub subject: ProposalSubject,
    /// Who proposes it; `None` for system proposals, which carry no
    /// implicit vote.
    pub proposer_id: Option<Uuid>,
    /// Silence-timer deadline.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of opening a proposal.
#[derive(Debug, Clone, Serialize)]
pub struct ProposalOutcome {
    /// The proposal as committed.
    pub proposal: Proposal,
    /// `true` if the implicit vote alone approved it.
    pub auto_approved: bool,
    /// Arena after the commit.
    #[serde(skip)]
    pub arena: GameArena,
}

/// Opens proposals.
#[async_trait]
pub trait ProposalGateway: Send + Sync {
    /// Stages the proposal (and the proposer's implicit vote) on top of the
    /// writes already in `uow`, approves it immediately if the implicit vote
    /// carries, and commits everything together.
    async fn open_proposal(
        &self,
        uow: UnitOfWork,
        draft: ProposalDraft,
    ) -> Result<ProposalOutcome, DomainError>;
}
