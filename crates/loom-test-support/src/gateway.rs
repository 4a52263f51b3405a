//! Test gateway: opens proposals without ever approving them.

use async_trait::async_trait;
use loom_core::changeset::{UnitOfWork, Write};
use loom_core::error::DomainError;
use loom_core::gateway::{ProposalDraft, ProposalGateway, ProposalOutcome};
use loom_core::model::{Proposal, ProposalStatus, Vote, VoteChoice};
use loom_core::repository::NarrativeStore;
use uuid::Uuid;

use crate::clock::fixed_now;

/// Stages the proposal and the implicit vote, then commits. Leaves every
/// proposal open, so narrative tests can inspect the pending state without
/// pulling in the voting engine.
pub struct OpenOnlyGateway<'a> {
    store: &'a dyn NarrativeStore,
}

impl<'a> OpenOnlyGateway<'a> {
    /// Creates a gateway committing to `store`.
    #[must_use]
    pub fn new(store: &'a dyn NarrativeStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ProposalGateway for OpenOnlyGateway<'_> {
    async fn open_proposal(
        &self,
        mut uow: UnitOfWork,
        draft: ProposalDraft,
    ) -> Result<ProposalOutcome, DomainError> {
        let proposal = Proposal {
            id: Uuid::new_v4(),
            game_id: uow.arena().game().id,
            subject: draft.subject,
            status: ProposalStatus::Open,
            proposer_id: draft.proposer_id,
            expires_at: draft.expires_at,
            created_at: fixed_now(),
        };
        uow.stage(Write::Proposal(proposal.clone()))?;
        if let Some(voter_id) = draft.proposer_id {
            uow.stage(Write::Vote(Vote {
                id: Uuid::new_v4(),
                proposal_id: proposal.id,
                voter_id,
                choice: VoteChoice::Yes,
                suggestion: None,
                cast_at: fixed_now(),
            }))?;
        }
        let arena = uow.commit(self.store).await?;
        Ok(ProposalOutcome {
            proposal,
            auto_approved: false,
            arena,
        })
    }
}
