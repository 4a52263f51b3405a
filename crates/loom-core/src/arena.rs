//! The in-process view of one game: every entity it owns, keyed by id.

use std::collections::HashMap;

use uuid::Uuid;

use crate::changeset::{Changeset, Guard, Write};
use crate::error::{ConflictKind, DomainError};
use crate::model::{
    Act, Beat, BeatComment, FortuneRoll, Game, OracleComment, OracleEvent, OracleVote, Proposal,
    ProposalType, Scene, StoryStatus, Tension, Vote,
};

/// Arena of a game's entities. Append-only collections (votes, comments)
/// keep insertion order.
#[derive(Debug, Clone)]
pub struct GameArena {
    game: Game,
    acts: HashMap<Uuid, Act>,
    scenes: HashMap<Uuid, Scene>,
    beats: HashMap<Uuid, Beat>,
    beat_comments: Vec<BeatComment>,
    proposals: HashMap<Uuid, Proposal>,
    votes: Vec<Vote>,
    fortune_rolls: HashMap<Uuid, FortuneRoll>,
    oracles: HashMap<Uuid, OracleEvent>,
    oracle_votes: Vec<OracleVote>,
    oracle_comments: Vec<OracleComment>,
}

impl GameArena {
    /// Creates an arena holding only the game.
    #[must_use]
    pub fn new(game: Game) -> Self {
        Self {
            game,
            acts: HashMap::new(),
            scenes: HashMap::new(),
            beats: HashMap::new(),
            beat_comments: Vec::new(),
            proposals: HashMap::new(),
            votes: Vec::new(),
            fortune_rolls: HashMap::new(),
            oracles: HashMap::new(),
            oracle_votes: Vec::new(),
            oracle_comments: Vec::new(),
        }
    }

    /// The owning game.
    #[must_use]
    pub fn game(&self) -> &Game {
        &self.game
    }

    // --- lookups ---

    /// Looks up an act.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the act is not in this game.
    pub fn act(&self, id: Uuid) -> Result<&Act, DomainError> {
        self.acts.get(&id).ok_or(DomainError::not_found("act", id))
    }

    /// Looks up a scene.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the scene is not in this game.
    pub fn scene(&self, id: Uuid) -> Result<&Scene, DomainError> {
        self.scenes
            .get(&id)
            .ok_or(DomainError::not_found("scene", id))
    }

    /// Looks up a beat.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the beat is not in this game.
    pub fn beat(&self, id: Uuid) -> Result<&Beat, DomainError> {
        self.beats.get(&id).ok_or(DomainError::not_found("beat", id))
    }

    /// Looks up a proposal.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the proposal is not in this game.
    pub fn proposal(&self, id: Uuid) -> Result<&Proposal, DomainError> {
        self.proposals
            .get(&id)
            .ok_or(DomainError::not_found("proposal", id))
    }

    /// Looks up a fortune roll.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the roll is not in this game.
    pub fn fortune_roll(&self, id: Uuid) -> Result<&FortuneRoll, DomainError> {
        self.fortune_rolls
            .get(&id)
            .ok_or(DomainError::not_found("fortune roll", id))
    }

    /// Looks up an oracle event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the oracle is not in this game.
    pub fn oracle(&self, id: Uuid) -> Result<&OracleEvent, DomainError> {
        self.oracles
            .get(&id)
            .ok_or(DomainError::not_found("oracle", id))
    }

    // --- ordered views ---

    /// Acts in story order.
    #[must_use]
    pub fn acts(&self) -> Vec<&Act> {
        let mut acts: Vec<&Act> = self.acts.values().collect();
        acts.sort_by_key(|act| (act.order, act.id));
        acts
    }

    /// Scenes of an act in story order.
    #[must_use]
    pub fn scenes_of(&self, act_id: Uuid) -> Vec<&Scene> {
        let mut scenes: Vec<&Scene> = self
            .scenes
            .values()
            .filter(|scene| scene.act_id == act_id)
            .collect();
        scenes.sort_by_key(|scene| (scene.order, scene.id));
        scenes
    }

    /// Beats of a scene in story order.
    #[must_use]
    pub fn beats_of(&self, scene_id: Uuid) -> Vec<&Beat> {
        let mut beats: Vec<&Beat> = self
            .beats
            .values()
            .filter(|beat| beat.scene_id == scene_id)
            .collect();
        beats.sort_by_key(|beat| (beat.order, beat.id));
        beats
    }

    /// Comments on a beat, oldest first.
    #[must_use]
    pub fn comments_on_beat(&self, beat_id: Uuid) -> Vec<&BeatComment> {
        self.beat_comments
            .iter()
            .filter(|comment| comment.beat_id == beat_id)
            .collect()
    }

    /// All proposals, oldest first.
    #[must_use]
    pub fn proposals(&self) -> Vec<&Proposal> {
        let mut proposals: Vec<&Proposal> = self.proposals.values().collect();
        proposals.sort_by_key(|proposal| (proposal.created_at, proposal.id));
        proposals
    }

    /// The open proposal holding a dedup key, if any.
    #[must_use]
    pub fn open_proposal(
        &self,
        proposal_type: ProposalType,
        target: Option<Uuid>,
    ) -> Option<&Proposal> {
        self.proposals
            .values()
            .find(|p| p.is_open() && p.dedup_key() == (proposal_type, target))
    }

    /// The most recent beat proposal for a beat.
    #[must_use]
    pub fn latest_beat_proposal(&self, beat_id: Uuid) -> Option<&Proposal> {
        self.proposals()
            .into_iter()
            .rev()
            .find(|p| {
                p.proposal_type() == ProposalType::BeatProposal
                    && p.subject.target_id() == Some(beat_id)
            })
    }

    /// Votes on a proposal in the order they were recorded.
    #[must_use]
    pub fn votes_on(&self, proposal_id: Uuid) -> Vec<&Vote> {
        self.votes
            .iter()
            .filter(|vote| vote.proposal_id == proposal_id)
            .collect()
    }

    /// Fortune rolls, oldest first.
    #[must_use]
    pub fn fortune_rolls(&self) -> Vec<&FortuneRoll> {
        let mut rolls: Vec<&FortuneRoll> = self.fortune_rolls.values().collect();
        rolls.sort_by_key(|roll| (roll.created_at, roll.id));
        rolls
    }

    /// Oracle events, oldest first.
    #[must_use]
    pub fn oracles(&self) -> Vec<&OracleEvent> {
        let mut oracles: Vec<&OracleEvent> = self.oracles.values().collect();
        oracles.sort_by_key(|oracle| (oracle.created_at, oracle.id));
        oracles
    }

    /// Interpretation votes on an oracle in the order they were recorded.
    #[must_use]
    pub fn oracle_votes_on(&self, oracle_id: Uuid) -> Vec<&OracleVote> {
        self.oracle_votes
            .iter()
            .filter(|vote| vote.oracle_id == oracle_id)
            .collect()
    }

    /// Comments on an oracle, oldest first.
    #[must_use]
    pub fn comments_on_oracle(&self, oracle_id: Uuid) -> Vec<&OracleComment> {
        self.oracle_comments
            .iter()
            .filter(|comment| comment.oracle_id == oracle_id)
            .collect()
    }

    // --- derived values ---

    /// Order for the next act.
    #[must_use]
    pub fn next_act_order(&self) -> u32 {
        self.acts.values().map(|act| act.order).max().unwrap_or(0) + 1
    }

    /// Order for the next scene of an act.
    #[must_use]
    pub fn next_scene_order(&self, act_id: Uuid) -> u32 {
        self.scenes_of(act_id)
            .last()
            .map_or(0, |scene| scene.order)
            + 1
    }

    /// Order for the next beat of a scene.
    #[must_use]
    pub fn next_beat_order(&self, scene_id: Uuid) -> u32 {
        self.beats_of(scene_id).last().map_or(0, |beat| beat.order) + 1
    }

    /// Tension carried forward by the most recently completed scene.
    #[must_use]
    pub fn carried_tension(&self) -> Option<Tension> {
        self.acts()
            .into_iter()
            .flat_map(|act| self.scenes_of(act.id))
            .filter(|scene| scene.status == StoryStatus::Complete)
            .filter_map(|scene| scene.tension_carry_forward)
            .last()
    }

    // --- mutation ---

    /// Evaluates a commit guard.
    ///
    /// # Errors
    ///
    /// Returns `Conflict(AlreadyResolved)` if the guarded state has moved
    /// on, or `NotFound` if the guarded entity is missing.
    pub fn check(&self, guard: &Guard) -> Result<(), DomainError> {
        let holds = match guard {
            Guard::ProposalOpen(id) => self.proposal(*id)?.is_open(),
            Guard::FortuneRollPending(id) => self.fortune_roll(*id)?.is_pending(),
            Guard::OracleUnselected(id) => !self.oracle(*id)?.is_finalized(),
            Guard::BeatStatus { beat_id, expected } => self.beat(*beat_id)?.status == *expected,
        };
        if holds {
            Ok(())
        } else {
            Err(DomainError::Conflict(ConflictKind::AlreadyResolved))
        }
    }

    /// Applies one write, enforcing the uniqueness rules the store enforces.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` for duplicate votes or duplicate open proposals,
    /// and `NotFound` when a write references a missing parent.
    pub fn put(&mut self, write: Write) -> Result<(), DomainError> {
        match write {
            Write::Game(game) => {
                if game.id != self.game.id {
                    return Err(DomainError::Infrastructure(format!(
                        "write for game {} applied to game {}",
                        game.id, self.game.id
                    )));
                }
                self.game = game;
            }
            Write::Act(act) => {
                self.acts.insert(act.id, act);
            }
            Write::Scene(scene) => {
                self.act(scene.act_id)?;
                self.scenes.insert(scene.id, scene);
            }
            Write::Beat(beat) => {
                self.scene(beat.scene_id)?;
                self.beats.insert(beat.id, beat);
            }
            Write::BeatComment(comment) => {
                self.beat(comment.beat_id)?;
                self.beat_comments.retain(|c| c.id != comment.id);
                self.beat_comments.push(comment);
            }
            Write::Proposal(proposal) => {
                if proposal.is_open() {
                    let key = proposal.dedup_key();
                    let clash = self
                        .proposals
                        .values()
                        .any(|p| p.id != proposal.id && p.is_open() && p.dedup_key() == key);
                    if clash {
                        return Err(DomainError::Conflict(ConflictKind::DuplicateOpenProposal));
                    }
                }
                self.proposals.insert(proposal.id, proposal);
            }
            Write::Vote(vote) => {
                self.proposal(vote.proposal_id)?;
                let duplicate = self.votes.iter().any(|v| {
                    v.id != vote.id
                        && v.proposal_id == vote.proposal_id
                        && v.voter_id == vote.voter_id
                });
                if duplicate {
                    return Err(DomainError::Conflict(ConflictKind::AlreadyVoted));
                }
                self.votes.retain(|v| v.id != vote.id);
                self.votes.push(vote);
            }
            Write::FortuneRoll(roll) => {
                self.beat(roll.beat_id)?;
                self.fortune_rolls.insert(roll.id, roll);
            }
            Write::Oracle(oracle) => {
                self.beat(oracle.beat_id)?;
                self.oracles.insert(oracle.id, oracle);
            }
            Write::OracleVote(vote) => {
                self.oracle(vote.oracle_id)?;
                let duplicate = self.oracle_votes.iter().any(|v| {
                    v.id != vote.id && v.oracle_id == vote.oracle_id && v.voter_id == vote.voter_id
                });
                if duplicate {
                    return Err(DomainError::Conflict(ConflictKind::AlreadyVoted));
                }
                self.oracle_votes.retain(|v| v.id != vote.id);
                self.oracle_votes.push(vote);
            }
            Write::OracleComment(comment) => {
                self.oracle(comment.oracle_id)?;
                self.oracle_comments.retain(|c| c.id != comment.id);
                self.oracle_comments.push(comment);
            }
        }
        Ok(())
    }

    /// Applies a whole changeset atomically: either every guard holds and
    /// every write applies, or the arena is left untouched.
    ///
    /// # Errors
    ///
    /// Returns the first failing guard or write.
    pub fn apply(&mut self, changeset: &Changeset) -> Result<(), DomainError> {
        if changeset.game_id != self.game.id {
            return Err(DomainError::Infrastructure(format!(
                "changeset for game {} applied to game {}",
                changeset.game_id, self.game.id
            )));
        }
        for guard in &changeset.guards {
            self.check(guard)?;
        }
        let mut next = self.clone();
        for write in &changeset.writes {
            next.put(write.clone())?;
        }
        *self = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::model::{
        GameSettings, GameStatus, ProposalStatus, ProposalSubject, VoteChoice,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    fn arena() -> GameArena {
        GameArena::new(Game {
            id: Uuid::new_v4(),
            name: "Ashfall".to_owned(),
            status: GameStatus::Active,
            members: vec![Uuid::new_v4(), Uuid::new_v4()],
            settings: GameSettings::default(),
            created_at: now(),
        })
    }

    fn open_proposal(game_id: Uuid, subject: ProposalSubject) -> Proposal {
        Proposal {
            id: Uuid::new_v4(),
            game_id,
            subject,
            status: ProposalStatus::Open,
            proposer_id: None,
            expires_at: None,
            created_at: now(),
        }
    }

    fn vote(proposal_id: Uuid, voter_id: Uuid) -> Vote {
        Vote {
            id: Uuid::new_v4(),
            proposal_id,
            voter_id,
            choice: VoteChoice::Yes,
            suggestion: None,
            cast_at: now(),
        }
    }

    #[test]
    fn test_lookup_missing_entity_is_not_found() {
        let arena = arena();
        let id = Uuid::new_v4();
        match arena.scene(id).unwrap_err() {
            DomainError::NotFound { entity, id: missing } => {
                assert_eq!(entity, "scene");
                assert_eq!(missing, id);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_second_open_proposal_with_same_key_conflicts() {
        let mut arena = arena();
        let game_id = arena.game().id;
        arena
            .put(Write::Proposal(open_proposal(
                game_id,
                ProposalSubject::ReadyToPlay,
            )))
            .unwrap();

        let result = arena.put(Write::Proposal(open_proposal(
            game_id,
            ProposalSubject::ReadyToPlay,
        )));

        match result.unwrap_err() {
            DomainError::Conflict(ConflictKind::DuplicateOpenProposal) => {}
            other => panic!("expected DuplicateOpenProposal, got {other:?}"),
        }
    }

    #[test]
    fn test_approved_proposal_frees_its_key() {
        let mut arena = arena();
        let game_id = arena.game().id;
        let mut first = open_proposal(game_id, ProposalSubject::ReadyToPlay);
        arena.put(Write::Proposal(first.clone())).unwrap();
        first.status = ProposalStatus::Approved;
        arena.put(Write::Proposal(first)).unwrap();

        assert!(
            arena
                .put(Write::Proposal(open_proposal(
                    game_id,
                    ProposalSubject::ReadyToPlay
                )))
                .is_ok()
        );
    }

    #[test]
    fn test_duplicate_vote_conflicts() {
        let mut arena = arena();
        let game_id = arena.game().id;
        let voter = arena.game().members[0];
        let proposal = open_proposal(game_id, ProposalSubject::WorldDocApproval);
        let proposal_id = proposal.id;
        arena.put(Write::Proposal(proposal)).unwrap();
        arena.put(Write::Vote(vote(proposal_id, voter))).unwrap();

        match arena
            .put(Write::Vote(vote(proposal_id, voter)))
            .unwrap_err()
        {
            DomainError::Conflict(ConflictKind::AlreadyVoted) => {}
            other => panic!("expected AlreadyVoted, got {other:?}"),
        }
        assert_eq!(arena.votes_on(proposal_id).len(), 1);
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let mut arena = arena();
        let game_id = arena.game().id;
        let voter = arena.game().members[0];
        let proposal = open_proposal(game_id, ProposalSubject::WorldDocApproval);
        let proposal_id = proposal.id;

        let mut changeset = Changeset::new(game_id);
        changeset.writes.push(Write::Proposal(proposal));
        changeset.writes.push(Write::Vote(vote(proposal_id, voter)));
        changeset.writes.push(Write::Vote(vote(proposal_id, voter)));

        assert!(arena.apply(&changeset).is_err());
        assert!(arena.proposals().is_empty());
        assert!(arena.votes_on(proposal_id).is_empty());
    }

    #[test]
    fn test_guard_on_resolved_proposal_conflicts() {
        let mut arena = arena();
        let game_id = arena.game().id;
        let mut proposal = open_proposal(game_id, ProposalSubject::ReadyToPlay);
        proposal.status = ProposalStatus::Approved;
        let proposal_id = proposal.id;
        arena.put(Write::Proposal(proposal)).unwrap();

        match arena.check(&Guard::ProposalOpen(proposal_id)).unwrap_err() {
            DomainError::Conflict(ConflictKind::AlreadyResolved) => {}
            other => panic!("expected AlreadyResolved, got {other:?}"),
        }
    }

    #[test]
    fn test_scene_requires_known_act() {
        let mut arena = arena();
        let scene = Scene {
            id: Uuid::new_v4(),
            act_id: Uuid::new_v4(),
            guiding_question: "Who lit the beacon?".to_owned(),
            location: None,
            status: StoryStatus::Proposed,
            order: 1,
            tension: Tension::NEUTRAL,
            tension_carry_forward: None,
            narrative: None,
        };
        assert!(matches!(
            arena.put(Write::Scene(scene)),
            Err(DomainError::NotFound { entity: "act", .. })
        ));
    }
}
