//! Entities owned by a game.
//!
//! Entities refer to each other by id only; the [`crate::arena::GameArena`]
//! resolves those references.

mod fortune;
mod game;
mod oracle;
mod proposal;
mod story;

pub use fortune::{FortuneOutcome, FortuneRoll, OddsTier};
pub use game::{Game, GameSettings, GameStatus, SignificanceThreshold, TieBreakingMethod};
pub use oracle::{
    CUSTOM_INTERPRETATION, OracleComment, OracleEvent, OracleType, OracleVote, TIE_BREAK_REQUEST,
    WordPair,
};
pub use proposal::{
    Proposal, ProposalStatus, ProposalSubject, ProposalType, Vote, VoteChoice, VoteTally,
};
pub use story::{
    Act, Beat, BeatComment, BeatEvent, BeatStatus, ChallengeOutcome, Scene, Significance,
    StoryStatus, Tension,
};
