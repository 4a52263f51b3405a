//! The voting engine: opens proposals, settles them and runs what follows
//! an approval.
//!
//! Every decision commits in one changeset. Notifications and follow-ups
//! run only after that commit succeeded; a failing follow-up is logged and
//! never undoes the decision.

use async_trait::async_trait;
use loom_core::arena::GameArena;
use loom_core::changeset::{UnitOfWork, Write};
use loom_core::context::EngineContext;
use loom_core::error::{ConflictKind, DomainError};
use loom_core::gateway::{ProposalDraft, ProposalGateway, ProposalOutcome};
use loom_core::model::{
    BeatStatus, Proposal, ProposalStatus, ProposalSubject, Vote, VoteChoice,
};
use loom_core::notification::{
    Notification, NotificationKind, excerpt, game_link, scene_link,
};
use loom_narrative::domain::state_machine::FollowUp;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::dispatch;
use crate::domain::resolution::{self, Verdict};

/// What carried a proposal over the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ApprovalTrigger {
    /// The proposer's implicit vote alone.
    Implicit,
    /// Votes cast by members.
    Votes,
    /// The silence timer ran out.
    Silence,
}

/// Implements [`ProposalGateway`] on top of the threshold, tie-break and
/// dispatch rules.
pub struct VotingEngine<'a> {
    ctx: EngineContext<'a>,
}

impl<'a> VotingEngine<'a> {
    /// Creates an engine working with `ctx`.
    #[must_use]
    pub fn new(ctx: EngineContext<'a>) -> Self {
        Self { ctx }
    }

    /// Approves a stored proposal in its own commit and runs the
    /// follow-ups. Returns `None` if another request resolved it first.
    pub(crate) async fn settle(
        &self,
        arena: GameArena,
        proposal_id: Uuid,
        verdict: Verdict,
        trigger: ApprovalTrigger,
    ) -> Result<Option<GameArena>, DomainError> {
        let mut uow = UnitOfWork::new(arena);
        let follow_up = match dispatch::approve(&mut uow, proposal_id, verdict) {
            Err(DomainError::Conflict(ConflictKind::AlreadyResolved)) => return Ok(None),
            other => other?,
        };
        let arena = match uow.commit(self.ctx.store).await {
            Err(DomainError::Conflict(ConflictKind::AlreadyResolved)) => {
                info!(%proposal_id, "proposal was resolved concurrently");
                return Ok(None);
            }
            other => other?,
        };

        let proposal = arena.proposal(proposal_id)?.clone();
        info!(
            %proposal_id,
            proposal_type = proposal.proposal_type().as_str(),
            ?trigger,
            "proposal approved"
        );
        self.announce_approval(&arena, &proposal, trigger);
        Ok(Some(self.run_follow_up(arena, follow_up).await))
    }

    fn send(&self, notification: Notification) {
        if !notification.recipients.is_empty() {
            self.ctx.notifier.notify(notification);
        }
    }

    fn announce_opened(&self, arena: &GameArena, proposal: &Proposal) {
        let kind = match proposal.subject {
            ProposalSubject::ActProposal { .. } => NotificationKind::ActProposed,
            ProposalSubject::SceneProposal { .. } => NotificationKind::SceneProposed,
            _ => NotificationKind::VoteRequired,
        };
        self.send(
            Notification::to_members(
                arena.game(),
                proposal.proposer_id,
                kind,
                format!("Vote needed: {}", label(arena, &proposal.subject)),
            )
            .with_link(link(arena, &proposal.subject)),
        );
    }

    fn announce_approval(&self, arena: &GameArena, proposal: &Proposal, trigger: ApprovalTrigger) {
        let ProposalSubject::BeatProposal { beat_id } = proposal.subject else {
            return;
        };
        let Ok(beat) = arena.beat(beat_id) else {
            return;
        };
        if trigger == ApprovalTrigger::Implicit && proposal.proposer_id == Some(beat.author_id) {
            return;
        }
        let message = match trigger {
            ApprovalTrigger::Silence => {
                "Your beat was auto-approved (silence timer expired)".to_owned()
            }
            ApprovalTrigger::Implicit | ApprovalTrigger::Votes => {
                format!("Approved: {}", label(arena, &proposal.subject))
            }
        };
        self.send(
            Notification::to_user(
                arena.game().id,
                beat.author_id,
                NotificationKind::BeatApproved,
                message,
            )
            .with_link(scene_link(arena.game().id, beat.scene_id)),
        );
    }

    async fn run_follow_up(&self, arena: GameArena, follow_up: Option<FollowUp>) -> GameArena {
        match follow_up {
            None => arena,
            Some(FollowUp::SceneCompleted { scene_id }) => {
                let opened = self.open_tension_vote(&arena, scene_id).await;
                let arena = keep_going(opened, arena, "tension vote");
                let compiled = self.compile_scene_narrative(&arena, scene_id).await;
                keep_going(compiled, arena, "scene narrative")
            }
            Some(FollowUp::ActCompleted { act_id }) => {
                let compiled = self.compile_act_narrative(&arena, act_id).await;
                keep_going(compiled, arena, "act narrative")
            }
        }
    }

    async fn open_tension_vote(
        &self,
        arena: &GameArena,
        scene_id: Uuid,
    ) -> Result<GameArena, DomainError> {
        let scene = arena.scene(scene_id)?;
        let summary = std::iter::once(scene.guiding_question.clone())
            .chain(canon_prose(arena, scene_id))
            .collect::<Vec<_>>()
            .join("\n");
        let (delta, rationale) = match self.ctx.assistant.suggest_tension_delta(&summary).await {
            Ok(suggestion) => (suggestion.delta.clamp(-1, 1), Some(suggestion.rationale)),
            Err(e) => {
                warn!(%scene_id, error = %e, "tension suggestion failed, defaulting to hold");
                (0, None)
            }
        };

        let game = arena.game();
        let proposal = Proposal {
            id: Uuid::new_v4(),
            game_id: game.id,
            subject: ProposalSubject::TensionAdjustment {
                scene_id,
                delta,
                rationale,
            },
            status: ProposalStatus::Open,
            proposer_id: None,
            expires_at: Some(
                self.ctx
                    .clock
                    .hours_from_now(game.settings.silence_timer_hours),
            ),
            created_at: self.ctx.clock.now(),
        };
        let mut uow = UnitOfWork::new(arena.clone());
        uow.stage(Write::Proposal(proposal.clone()))?;
        let arena = uow.commit(self.ctx.store).await?;
        debug!(proposal_id = %proposal.id, %scene_id, delta, "tension vote opened");
        self.announce_opened(&arena, &proposal);
        Ok(arena)
    }

    async fn compile_scene_narrative(
        &self,
        arena: &GameArena,
        scene_id: Uuid,
    ) -> Result<GameArena, DomainError> {
        let passages: Vec<String> = canon_prose(arena, scene_id).collect();
        if !arena.game().settings.auto_generate_narrative || passages.is_empty() {
            return Ok(arena.clone());
        }
        let narrative = self.ctx.assistant.synthesize(&passages).await?;
        let mut scene = arena.scene(scene_id)?.clone();
        scene.narrative = Some(narrative);
        let mut uow = UnitOfWork::new(arena.clone());
        uow.stage(Write::Scene(scene))?;
        uow.commit(self.ctx.store).await
    }

    async fn compile_act_narrative(
        &self,
        arena: &GameArena,
        act_id: Uuid,
    ) -> Result<GameArena, DomainError> {
        let passages: Vec<String> = arena
            .scenes_of(act_id)
            .into_iter()
            .filter_map(|scene| scene.narrative.clone())
            .collect();
        if !arena.game().settings.auto_generate_narrative || passages.is_empty() {
            return Ok(arena.clone());
        }
        let narrative = self.ctx.assistant.synthesize(&passages).await?;
        let mut act = arena.act(act_id)?.clone();
        act.narrative = Some(narrative);
        let mut uow = UnitOfWork::new(arena.clone());
        uow.stage(Write::Act(act))?;
        uow.commit(self.ctx.store).await
    }
}

#[async_trait]
impl ProposalGateway for VotingEngine<'_> {
    async fn open_proposal(
        &self,
        mut uow: UnitOfWork,
        draft: ProposalDraft,
    ) -> Result<ProposalOutcome, DomainError> {
        let now = self.ctx.clock.now();
        let proposal = Proposal {
            id: Uuid::new_v4(),
            game_id: uow.arena().game().id,
            subject: draft.subject,
            status: ProposalStatus::Open,
            proposer_id: draft.proposer_id,
            expires_at: draft.expires_at,
            created_at: now,
        };
        let proposal_id = proposal.id;
        uow.stage(Write::Proposal(proposal))?;
        if let Some(voter_id) = draft.proposer_id {
            uow.stage(Write::Vote(Vote {
                id: Uuid::new_v4(),
                proposal_id,
                voter_id,
                choice: VoteChoice::Yes,
                suggestion: None,
                cast_at: now,
            }))?;
        }

        let verdict = resolution::evaluate(uow.arena(), uow.arena().proposal(proposal_id)?);
        let follow_up = if verdict.is_resolved() {
            dispatch::approve_staged(&mut uow, proposal_id, verdict)?
        } else {
            None
        };
        let arena = uow.commit(self.ctx.store).await?;
        let proposal = arena.proposal(proposal_id)?.clone();
        let auto_approved = verdict.is_resolved();
        info!(
            %proposal_id,
            proposal_type = proposal.proposal_type().as_str(),
            auto_approved,
            "proposal opened"
        );

        let arena = if auto_approved {
            self.announce_approval(&arena, &proposal, ApprovalTrigger::Implicit);
            self.run_follow_up(arena, follow_up).await
        } else {
            self.announce_opened(&arena, &proposal);
            arena
        };
        Ok(ProposalOutcome {
            proposal,
            auto_approved,
            arena,
        })
    }
}

fn keep_going(
    result: Result<GameArena, DomainError>,
    previous: GameArena,
    step: &str,
) -> GameArena {
    match result {
        Ok(arena) => arena,
        Err(e) => {
            warn!(game_id = %previous.game().id, error = %e, step, "follow-up failed");
            previous
        }
    }
}

fn canon_prose(arena: &GameArena, scene_id: Uuid) -> impl Iterator<Item = String> + '_ {
    arena
        .beats_of(scene_id)
        .into_iter()
        .filter(|beat| beat.status == BeatStatus::Canon)
        .map(|beat| beat.prose())
        .filter(|prose| !prose.is_empty())
}

/// Short description of what a proposal decides, for messages.
fn label(arena: &GameArena, subject: &ProposalSubject) -> String {
    let act_question = |act_id| {
        arena
            .act(act_id)
            .map(|act| excerpt(&act.guiding_question))
            .unwrap_or_default()
    };
    let scene_question = |scene_id| {
        arena
            .scene(scene_id)
            .map(|scene| excerpt(&scene.guiding_question))
            .unwrap_or_default()
    };
    match subject {
        ProposalSubject::WorldDocApproval => "world document".to_owned(),
        ProposalSubject::ReadyToPlay => "ready to play".to_owned(),
        ProposalSubject::ActProposal { act_id } => {
            format!("act proposal \"{}\"", act_question(*act_id))
        }
        ProposalSubject::ActComplete { act_id } => {
            format!("complete act \"{}\"", act_question(*act_id))
        }
        ProposalSubject::SceneProposal { scene_id } => {
            format!("scene proposal \"{}\"", scene_question(*scene_id))
        }
        ProposalSubject::SceneComplete { scene_id } => {
            format!("complete scene \"{}\"", scene_question(*scene_id))
        }
        ProposalSubject::BeatProposal { .. } => "major beat submitted".to_owned(),
        ProposalSubject::TensionAdjustment { scene_id, .. } => {
            format!("tension for scene \"{}\"", scene_question(*scene_id))
        }
    }
}

fn link(arena: &GameArena, subject: &ProposalSubject) -> String {
    let game_id = arena.game().id;
    match subject {
        ProposalSubject::SceneProposal { scene_id }
        | ProposalSubject::SceneComplete { scene_id }
        | ProposalSubject::TensionAdjustment { scene_id, .. } => scene_link(game_id, *scene_id),
        ProposalSubject::BeatProposal { beat_id } => arena
            .beat(*beat_id)
            .map_or_else(|_| game_link(game_id), |beat| scene_link(game_id, beat.scene_id)),
        ProposalSubject::WorldDocApproval
        | ProposalSubject::ReadyToPlay
        | ProposalSubject::ActProposal { .. }
        | ProposalSubject::ActComplete { .. } => game_link(game_id),
    }
}

#[cfg(test)]
mod tests {
    use loom_core::model::{GameSettings, GameStatus, StoryStatus};
    use loom_test_support::{FailingAssistant, Harness};

    use super::*;

    async fn open_on(
        harness: &Harness,
        game_id: Uuid,
        subject: ProposalSubject,
        proposer_id: Option<Uuid>,
    ) -> ProposalOutcome {
        let engine = VotingEngine::new(harness.ctx());
        let uow = UnitOfWork::new(harness.arena(game_id).await);
        engine
            .open_proposal(
                uow,
                ProposalDraft {
                    subject,
                    proposer_id,
                    expires_at: None,
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_single_participant_auto_approves_with_implicit_vote() {
        // Arrange
        let harness = Harness::new();
        let game = harness
            .game_with(1, GameStatus::Setup, GameSettings::default())
            .await;

        // Act
        let outcome = open_on(
            &harness,
            game.id,
            ProposalSubject::WorldDocApproval,
            Some(game.members[0]),
        )
        .await;

        // Assert
        assert!(outcome.auto_approved);
        assert_eq!(outcome.proposal.status, ProposalStatus::Approved);
        assert_eq!(outcome.arena.game().status, GameStatus::Active);
        assert_eq!(outcome.arena.votes_on(outcome.proposal.id).len(), 1);
        assert!(harness.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_open_proposal_asks_other_members_to_vote() {
        let harness = Harness::new();
        let game = harness
            .game_with(3, GameStatus::Setup, GameSettings::default())
            .await;

        let outcome = open_on(
            &harness,
            game.id,
            ProposalSubject::ReadyToPlay,
            Some(game.members[1]),
        )
        .await;

        assert!(!outcome.auto_approved);
        let sent = harness.notifier.sent_of(NotificationKind::VoteRequired);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipients, vec![game.members[0], game.members[2]]);
        assert_eq!(sent[0].message, "Vote needed: ready to play");
    }

    #[tokio::test]
    async fn test_completed_scene_opens_tension_vote_and_compiles_narrative() {
        // Arrange
        let harness = Harness::new();
        let game = harness.game(1).await;
        let (_, scene) = harness.active_scene(&game).await;
        harness.canon_beat(&game, &scene, game.members[0]).await;

        // Act
        let outcome = open_on(
            &harness,
            game.id,
            ProposalSubject::SceneComplete { scene_id: scene.id },
            Some(game.members[0]),
        )
        .await;

        // Assert
        let arena = outcome.arena;
        let scene = arena.scene(scene.id).unwrap();
        assert_eq!(scene.status, StoryStatus::Complete);
        assert_eq!(
            scene.narrative.as_deref(),
            Some("The tide went out and did not return.")
        );
        let tension = arena
            .proposals()
            .into_iter()
            .find(|p| p.is_open())
            .cloned()
            .unwrap();
        assert_eq!(
            tension.subject,
            ProposalSubject::TensionAdjustment {
                scene_id: scene.id,
                delta: 1,
                rationale: Some("the stakes keep rising".to_owned()),
            }
        );
        assert_eq!(tension.proposer_id, None);
        assert!(arena.votes_on(tension.id).is_empty());
        assert_eq!(
            tension.expires_at,
            Some(harness.clock.0 + chrono::Duration::hours(12))
        );
        let asked = harness.notifier.sent_of(NotificationKind::VoteRequired);
        assert_eq!(asked[0].recipients, game.members);
    }

    #[tokio::test]
    async fn test_assistant_failure_does_not_undo_scene_completion() {
        let harness = Harness::new().with_assistant(FailingAssistant);
        let game = harness.game(1).await;
        let (_, scene) = harness.active_scene(&game).await;
        harness.canon_beat(&game, &scene, game.members[0]).await;

        let outcome = open_on(
            &harness,
            game.id,
            ProposalSubject::SceneComplete { scene_id: scene.id },
            Some(game.members[0]),
        )
        .await;

        let stored = harness.arena(game.id).await;
        let scene = stored.scene(scene.id).unwrap();
        assert!(outcome.auto_approved);
        assert_eq!(scene.status, StoryStatus::Complete);
        assert_eq!(scene.narrative, None);
        let tension = stored
            .proposals()
            .into_iter()
            .find(|p| p.is_open())
            .cloned()
            .unwrap();
        assert!(matches!(
            tension.subject,
            ProposalSubject::TensionAdjustment {
                delta: 0,
                rationale: None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_settle_reports_lost_race() {
        // Arrange
        let harness = Harness::new();
        let game = harness
            .game_with(2, GameStatus::Setup, GameSettings::default())
            .await;
        let outcome = open_on(
            &harness,
            game.id,
            ProposalSubject::ReadyToPlay,
            Some(game.members[0]),
        )
        .await;
        let stale = harness.arena(game.id).await;
        let engine = VotingEngine::new(harness.ctx());

        // Act
        let first = engine
            .settle(
                stale.clone(),
                outcome.proposal.id,
                Verdict::Approve,
                ApprovalTrigger::Votes,
            )
            .await
            .unwrap();
        let second = engine
            .settle(
                stale,
                outcome.proposal.id,
                Verdict::Approve,
                ApprovalTrigger::Votes,
            )
            .await
            .unwrap();

        // Assert
        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_completed_act_compiles_from_scene_narratives() {
        let harness = Harness::new();
        let game = harness.game(1).await;
        let (act, scene) = harness.active_scene(&game).await;
        let mut done = scene.clone();
        done.narrative = Some("The docks burned.".to_owned());
        let mut uow = UnitOfWork::new(harness.arena(game.id).await);
        uow.stage(Write::Scene(done)).unwrap();
        uow.commit(&harness.store).await.unwrap();

        let outcome = open_on(
            &harness,
            game.id,
            ProposalSubject::ActComplete { act_id: act.id },
            Some(game.members[0]),
        )
        .await;

        let act = outcome.arena.act(act.id).unwrap();
        assert_eq!(act.status, StoryStatus::Complete);
        assert_eq!(
            act.narrative.as_deref(),
            Some("The tide went out and did not return.")
        );
    }
}
