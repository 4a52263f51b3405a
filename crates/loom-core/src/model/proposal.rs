use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a proposal decides, with its target.
///
/// Adding a variant forces every dispatch site to handle it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProposalSubject {
    /// Approve the world document and start play.
    WorldDocApproval,
    /// Declare the group ready and start play.
    ReadyToPlay,
    /// Start a new act.
    ActProposal {
        /// The proposed act.
        act_id: Uuid,
    },
    /// Finish the active act.
    ActComplete {
        /// The act to finish.
        act_id: Uuid,
    },
    /// Start a new scene.
    SceneProposal {
        /// The proposed scene.
        scene_id: Uuid,
    },
    /// Finish the active scene.
    SceneComplete {
        /// The scene to finish.
        scene_id: Uuid,
    },
    /// Make a major beat canon.
    BeatProposal {
        /// The beat under vote.
        beat_id: Uuid,
    },
    /// Escalate, hold or ease tension after a scene.
    TensionAdjustment {
        /// The scene whose tension is adjusted.
        scene_id: Uuid,
        /// Assistant-suggested delta, used when the vote is inconclusive.
        delta: i32,
        /// Why the assistant suggested it.
        rationale: Option<String>,
    },
}

/// Flat proposal kind, used for keys and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalType {
    /// See [`ProposalSubject::WorldDocApproval`].
    WorldDocApproval,
    /// See [`ProposalSubject::ReadyToPlay`].
    ReadyToPlay,
    /// See [`ProposalSubject::ActProposal`].
    ActProposal,
    /// See [`ProposalSubject::ActComplete`].
    ActComplete,
    /// See [`ProposalSubject::SceneProposal`].
    SceneProposal,
    /// See [`ProposalSubject::SceneComplete`].
    SceneComplete,
    /// See [`ProposalSubject::BeatProposal`].
    BeatProposal,
    /// See [`ProposalSubject::TensionAdjustment`].
    TensionAdjustment,
}

impl ProposalType {
    /// Snake-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WorldDocApproval => "world_doc_approval",
            Self::ReadyToPlay => "ready_to_play",
            Self::ActProposal => "act_proposal",
            Self::ActComplete => "act_complete",
            Self::SceneProposal => "scene_proposal",
            Self::SceneComplete => "scene_complete",
            Self::BeatProposal => "beat_proposal",
            Self::TensionAdjustment => "tension_adjustment",
        }
    }
}

impl ProposalSubject {
    /// The flat type of this subject.
    #[must_use]
    pub fn proposal_type(&self) -> ProposalType {
        match self {
            Self::WorldDocApproval => ProposalType::WorldDocApproval,
            Self::ReadyToPlay => ProposalType::ReadyToPlay,
            Self::ActProposal { .. } => ProposalType::ActProposal,
            Self::ActComplete { .. } => ProposalType::ActComplete,
            Self::SceneProposal { .. } => ProposalType::SceneProposal,
            Self::SceneComplete { .. } => ProposalType::SceneComplete,
            Self::BeatProposal { .. } => ProposalType::BeatProposal,
            Self::TensionAdjustment { .. } => ProposalType::TensionAdjustment,
        }
    }

    /// The act, scene or beat this subject refers to.
    #[must_use]
    pub fn target_id(&self) -> Option<Uuid> {
        match self {
            Self::WorldDocApproval | Self::ReadyToPlay => None,
            Self::ActProposal { act_id } | Self::ActComplete { act_id } => Some(*act_id),
            Self::SceneProposal { scene_id }
            | Self::SceneComplete { scene_id }
            | Self::TensionAdjustment { scene_id, .. } => Some(*scene_id),
            Self::BeatProposal { beat_id } => Some(*beat_id),
        }
    }

    /// The target that at most one open proposal of this type may hold.
    ///
    /// New acts and new scenes are deduplicated per game: only one act
    /// proposal and one scene proposal can be pending at a time.
    #[must_use]
    pub fn dedup_target(&self) -> Option<Uuid> {
        match self {
            Self::ActProposal { .. } | Self::SceneProposal { .. } => None,
            other => other.target_id(),
        }
    }
}

/// Lifecycle of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Collecting votes.
    Open,
    /// Decided; the transition has been applied.
    Approved,
}

/// A pending or decided group decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Proposal identifier.
    pub id: Uuid,
    /// Owning game.
    pub game_id: Uuid,
    /// What is being decided.
    pub subject: ProposalSubject,
    /// Current status.
    pub status: ProposalStatus,
    /// The member who proposed it; `None` for system proposals.
    pub proposer_id: Option<Uuid>,
    /// When silence turns into a decision.
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Proposal {
    /// Flat type of the proposal.
    #[must_use]
    pub fn proposal_type(&self) -> ProposalType {
        self.subject.proposal_type()
    }

    /// Returns `true` while votes are accepted.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == ProposalStatus::Open
    }

    /// The uniqueness key among open proposals of one game.
    #[must_use]
    pub fn dedup_key(&self) -> (ProposalType, Option<Uuid>) {
        (self.proposal_type(), self.subject.dedup_target())
    }

    /// Returns `true` once an open proposal's silence timer has run out.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// A member's choice on a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    /// In favour; escalate for tension votes.
    Yes,
    /// Against; ease for tension votes.
    No,
    /// Needs changes; hold for tension votes.
    SuggestModification,
}

/// One member's vote on one proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Vote identifier.
    pub id: Uuid,
    /// The proposal voted on.
    pub proposal_id: Uuid,
    /// The voter.
    pub voter_id: Uuid,
    /// The choice.
    pub choice: VoteChoice,
    /// Suggested change accompanying the vote.
    pub suggestion: Option<String>,
    /// When the vote was recorded.
    pub cast_at: DateTime<Utc>,
}

/// Vote counts per choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    /// Yes votes.
    pub yes: usize,
    /// No votes.
    pub no: usize,
    /// Suggest-modification votes.
    pub suggest: usize,
}

impl VoteTally {
    /// Counts the given votes.
    pub fn count<'a>(votes: impl IntoIterator<Item = &'a Vote>) -> Self {
        votes
            .into_iter()
            .fold(Self::default(), |mut tally, vote| {
                match vote.choice {
                    VoteChoice::Yes => tally.yes += 1,
                    VoteChoice::No => tally.no += 1,
                    VoteChoice::SuggestModification => tally.suggest += 1,
                }
                tally
            })
    }

    /// Total number of votes counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.yes + self.no + self.suggest
    }
}
