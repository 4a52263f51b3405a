//! Command handlers for the fortune context.
//!
//! A roll is made when it is submitted, but its outcome is only drawn once
//! the contest window has passed. Resolution is lazy: read paths call
//! [`resolve_fortune_roll_if_due`] or [`resolve_due_fortune_rolls`].

use loom_core::changeset::{Guard, UnitOfWork, Write};
use loom_core::context::EngineContext;
use loom_core::error::{ConflictKind, DomainError};
use loom_core::gateway::{ProposalDraft, ProposalGateway};
use loom_core::model::{Beat, BeatEvent, BeatStatus, FortuneRoll, ProposalSubject, Significance};
use loom_core::notification::{Notification, NotificationKind, excerpt, scene_link};
use loom_narrative::application::command_handlers::{draft_beat, ensure_scene_active};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::commands::{ContestFortuneRoll, ReaffirmFortuneRoll, SubmitFortuneRoll};
use crate::domain::table;

/// Result of submitting a fortune roll.
#[derive(Debug, Clone, Serialize)]
pub struct FortuneRollSubmission {
    /// The beat holding the roll.
    pub beat: Beat,
    /// The pending roll.
    pub roll: FortuneRoll,
}

/// Handles the `SubmitFortuneRoll` command: records the question with a
/// proposed minor beat and opens the contest window.
///
/// # Errors
///
/// `Forbidden` for non-members, `InvalidState` unless the game and scene are
/// active, `Validation` for a blank question.
pub async fn handle_submit_fortune_roll(
    command: &SubmitFortuneRoll,
    ctx: &EngineContext<'_>,
) -> Result<FortuneRollSubmission, DomainError> {
    let mut uow = ctx.begin(command).await?;
    let game = uow.arena().game().clone();
    game.ensure_member(command.actor_id)?;
    game.ensure_active()?;
    let scene = uow.arena().scene(command.scene_id)?.clone();
    ensure_scene_active(&scene)?;

    let question = command.question.trim();
    if question.is_empty() {
        return Err(DomainError::validation("question must not be empty"));
    }

    let roll_id = Uuid::new_v4();
    let order = uow.arena().next_beat_order(scene.id);
    let mut beat = draft_beat(
        ctx,
        &scene,
        order,
        command.actor_id,
        Significance::Minor,
        vec![BeatEvent::FortuneRoll { roll_id }],
    );
    beat.status = BeatStatus::Proposed;
    let roll = FortuneRoll {
        id: roll_id,
        beat_id: beat.id,
        scene_id: scene.id,
        invoker_id: command.actor_id,
        question: question.to_owned(),
        odds: command.odds,
        tension: scene.tension,
        result: None,
        expires_at: ctx.clock.hours_from_now(game.contest_window_hours()),
        contested: false,
        created_at: ctx.clock.now(),
    };
    uow.stage(Write::Beat(beat.clone()))?;
    uow.stage(Write::FortuneRoll(roll.clone()))?;
    uow.commit(ctx.store).await?;

    ctx.notifier.notify(
        Notification::to_members(
            &game,
            Some(command.actor_id),
            NotificationKind::NewBeat,
            format!("Fortune roll: \"{}\"", excerpt(&roll.question)),
        )
        .with_link(scene_link(game.id, scene.id)),
    );
    info!(
        roll_id = %roll.id,
        odds = roll.odds.label(),
        tension = %roll.tension,
        expires_at = %roll.expires_at,
        "fortune roll submitted"
    );
    Ok(FortuneRollSubmission { beat, roll })
}

/// Handles the `ContestFortuneRoll` command. A contested roll stays pending
/// until the invoker reaffirms it.
///
/// # Errors
///
/// `Forbidden` for non-members, `InvalidState` if the roll has resolved or
/// is already contested, `Conflict` if it resolved concurrently.
pub async fn handle_contest_fortune_roll(
    command: &ContestFortuneRoll,
    ctx: &EngineContext<'_>,
) -> Result<FortuneRoll, DomainError> {
    let mut uow = ctx.begin(command).await?;
    let game = uow.arena().game().clone();
    game.ensure_member(command.actor_id)?;

    let mut roll = uow.arena().fortune_roll(command.roll_id)?.clone();
    if !roll.is_pending() {
        return Err(DomainError::invalid_state("fortune roll has already resolved"));
    }
    if roll.contested {
        return Err(DomainError::invalid_state("fortune roll is already contested"));
    }
    uow.guard(Guard::FortuneRollPending(roll.id))?;
    roll.contested = true;
    uow.stage(Write::FortuneRoll(roll.clone()))?;
    uow.commit(ctx.store).await?;

    if roll.invoker_id != command.actor_id {
        ctx.notifier.notify(
            Notification::to_user(
                game.id,
                roll.invoker_id,
                NotificationKind::FortuneRollContested,
                format!("Your fortune roll was contested: \"{}\"", excerpt(&roll.question)),
            )
            .with_link(scene_link(game.id, roll.scene_id)),
        );
    }
    info!(roll_id = %roll.id, contested_by = %command.actor_id, "fortune roll contested");
    Ok(roll)
}

/// Handles the `ReaffirmFortuneRoll` command: the invoker stands by a
/// contested roll and the contest window starts over.
///
/// # Errors
///
/// `Forbidden` for anyone but the invoker, `InvalidState` unless the roll
/// is pending and contested.
pub async fn handle_reaffirm_fortune_roll(
    command: &ReaffirmFortuneRoll,
    ctx: &EngineContext<'_>,
) -> Result<FortuneRoll, DomainError> {
    let mut uow = ctx.begin(command).await?;
    let game = uow.arena().game().clone();
    let mut roll = uow.arena().fortune_roll(command.roll_id)?.clone();
    if roll.invoker_id != command.actor_id {
        return Err(DomainError::forbidden("only the invoker can reaffirm a fortune roll"));
    }
    if !roll.is_pending() {
        return Err(DomainError::invalid_state("fortune roll has already resolved"));
    }
    if !roll.contested {
        return Err(DomainError::invalid_state("fortune roll is not contested"));
    }
    uow.guard(Guard::FortuneRollPending(roll.id))?;
    roll.contested = false;
    roll.expires_at = ctx.clock.hours_from_now(game.contest_window_hours());
    uow.stage(Write::FortuneRoll(roll.clone()))?;
    uow.commit(ctx.store).await?;

    info!(roll_id = %roll.id, expires_at = %roll.expires_at, "fortune roll reaffirmed");
    Ok(roll)
}

/// Resolves one roll if its contest window has passed uncontested, and
/// returns the roll as it now stands. A roll resolved concurrently is
/// reloaded rather than reported as an error.
///
/// # Errors
///
/// Returns `DomainError::NotFound` for an unknown game or roll, or the
/// store's error.
pub async fn resolve_fortune_roll_if_due(
    game_id: Uuid,
    roll_id: Uuid,
    ctx: &EngineContext<'_>,
    proposals: &dyn ProposalGateway,
) -> Result<FortuneRoll, DomainError> {
    let arena = ctx.store.load_arena(game_id).await?;
    let roll = arena.fortune_roll(roll_id)?.clone();
    if !roll.is_due(ctx.clock.now()) {
        return Ok(roll);
    }
    match resolve(UnitOfWork::new(arena), roll, ctx, proposals).await {
        Ok(resolved) => Ok(resolved),
        Err(DomainError::Conflict(ConflictKind::AlreadyResolved)) => {
            debug!(%roll_id, "fortune roll was resolved concurrently");
            let arena = ctx.store.load_arena(game_id).await?;
            Ok(arena.fortune_roll(roll_id)?.clone())
        }
        Err(e) => Err(e),
    }
}

/// Resolves every due roll of a game and returns the ids of the rolls
/// resolved by this call.
///
/// # Errors
///
/// Returns `DomainError::NotFound` for an unknown game, or the first store
/// error encountered.
pub async fn resolve_due_fortune_rolls(
    game_id: Uuid,
    ctx: &EngineContext<'_>,
    proposals: &dyn ProposalGateway,
) -> Result<Vec<Uuid>, DomainError> {
    let arena = ctx.store.load_arena(game_id).await?;
    let now = ctx.clock.now();
    let due: Vec<Uuid> = arena
        .fortune_rolls()
        .into_iter()
        .filter(|roll| roll.is_due(now))
        .map(|roll| roll.id)
        .collect();

    let mut resolved = Vec::with_capacity(due.len());
    for roll_id in due {
        let arena = ctx.store.load_arena(game_id).await?;
        let roll = arena.fortune_roll(roll_id)?.clone();
        if !roll.is_due(now) {
            continue;
        }
        match resolve(UnitOfWork::new(arena), roll, ctx, proposals).await {
            Ok(_) => resolved.push(roll_id),
            Err(DomainError::Conflict(ConflictKind::AlreadyResolved)) => {
                debug!(%roll_id, "fortune roll was resolved concurrently");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(resolved)
}

async fn resolve(
    mut uow: UnitOfWork,
    mut roll: FortuneRoll,
    ctx: &EngineContext<'_>,
    proposals: &dyn ProposalGateway,
) -> Result<FortuneRoll, DomainError> {
    uow.guard(Guard::FortuneRollPending(roll.id))?;
    let outcome = ctx.with_rng(|rng| table::compute_result(roll.odds, roll.tension.get(), rng))?;
    roll.result = Some(outcome);
    uow.stage(Write::FortuneRoll(roll.clone()))?;

    let game = uow.arena().game().clone();
    let mut beat = uow.arena().beat(roll.beat_id)?.clone();
    if outcome.is_exceptional() {
        beat.significance = Significance::Major;
        beat.status = BeatStatus::Proposed;
        let author_id = beat.author_id;
        uow.stage(Write::Beat(beat))?;
        let opened = proposals
            .open_proposal(
                uow,
                ProposalDraft {
                    subject: ProposalSubject::BeatProposal {
                        beat_id: roll.beat_id,
                    },
                    proposer_id: Some(author_id),
                    expires_at: Some(ctx.clock.hours_from_now(game.settings.silence_timer_hours)),
                },
            )
            .await?;
        debug!(proposal_id = %opened.proposal.id, auto_approved = opened.auto_approved, "exceptional result sent to a vote");
    } else {
        beat.significance = Significance::Minor;
        beat.status = BeatStatus::Canon;
        uow.stage(Write::Beat(beat))?;
        uow.commit(ctx.store).await?;
    }

    info!(roll_id = %roll.id, result = outcome.label(), "fortune roll resolved");
    Ok(roll)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use loom_core::model::{
        FortuneOutcome, GameSettings, GameStatus, OddsTier, ProposalType, Scene, StoryStatus,
    };
    use loom_test_support::{FailingStore, Harness, OpenOnlyGateway};

    use super::*;

    fn submit(game_id: Uuid, actor_id: Uuid, scene: &Scene, odds: OddsTier) -> SubmitFortuneRoll {
        SubmitFortuneRoll {
            correlation_id: Uuid::new_v4(),
            game_id,
            actor_id,
            scene_id: scene.id,
            question: "Is the ferryman still waiting?".to_owned(),
            odds,
        }
    }

    fn contest(game_id: Uuid, actor_id: Uuid, roll_id: Uuid) -> ContestFortuneRoll {
        ContestFortuneRoll {
            correlation_id: Uuid::new_v4(),
            game_id,
            actor_id,
            roll_id,
        }
    }

    fn reaffirm(game_id: Uuid, actor_id: Uuid, roll_id: Uuid) -> ReaffirmFortuneRoll {
        ReaffirmFortuneRoll {
            correlation_id: Uuid::new_v4(),
            game_id,
            actor_id,
            roll_id,
        }
    }

    #[tokio::test]
    async fn test_submit_creates_pending_roll_and_proposed_beat() {
        // Arrange
        let harness = Harness::new();
        let game = harness.game(2).await;
        let (_, scene) = harness.active_scene(&game).await;
        let command = submit(game.id, game.members[0], &scene, OddsTier::Likely);

        // Act
        let submission = handle_submit_fortune_roll(&command, &harness.ctx())
            .await
            .unwrap();

        // Assert
        let arena = harness.arena(game.id).await;
        let roll = arena.fortune_roll(submission.roll.id).unwrap();
        assert!(roll.is_pending());
        assert_eq!(roll.tension, scene.tension);
        assert_eq!(roll.expires_at, harness.clock.0 + Duration::hours(6));
        let beat = arena.beat(roll.beat_id).unwrap();
        assert_eq!(beat.status, BeatStatus::Proposed);
        assert_eq!(beat.significance, Significance::Minor);
        assert_eq!(beat.events, vec![BeatEvent::FortuneRoll { roll_id: roll.id }]);
        let sent = harness.notifier.sent_of(NotificationKind::NewBeat);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipients, vec![game.members[1]]);
    }

    #[tokio::test]
    async fn test_submit_uses_contest_window_override() {
        let harness = Harness::new();
        let settings = GameSettings {
            fortune_roll_contest_window_hours: Some(2),
            ..GameSettings::default()
        };
        let game = harness.game_with(1, GameStatus::Active, settings).await;
        let (_, scene) = harness.active_scene(&game).await;

        let submission = handle_submit_fortune_roll(
            &submit(game.id, game.members[0], &scene, OddsTier::Unlikely),
            &harness.ctx(),
        )
        .await
        .unwrap();

        assert_eq!(submission.roll.expires_at, harness.clock.0 + Duration::hours(2));
    }

    #[tokio::test]
    async fn test_submit_rejects_blank_question() {
        let harness = Harness::new();
        let game = harness.game(1).await;
        let (_, scene) = harness.active_scene(&game).await;
        let mut command = submit(game.id, game.members[0], &scene, OddsTier::Likely);
        command.question = "   ".to_owned();

        let err = handle_submit_fortune_roll(&command, &harness.ctx())
            .await
            .unwrap_err();

        match err {
            DomainError::Validation(msg) => assert!(msg.contains("question")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_rejects_inactive_scene() {
        let harness = Harness::new();
        let game = harness.game(1).await;
        let act = harness.act(&game, StoryStatus::Active).await;
        let scene = harness.scene(&game, &act, StoryStatus::Complete).await;

        let err = handle_submit_fortune_roll(
            &submit(game.id, game.members[0], &scene, OddsTier::Likely),
            &harness.ctx(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DomainError::InvalidState(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_submit_rejects_non_member() {
        let harness = Harness::new();
        let game = harness.game(1).await;
        let (_, scene) = harness.active_scene(&game).await;

        let err = handle_submit_fortune_roll(
            &submit(game.id, Uuid::new_v4(), &scene, OddsTier::Likely),
            &harness.ctx(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DomainError::Forbidden(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_yes_result_canonizes_minor_beat() {
        // Arrange
        let mut harness = Harness::with_draws(vec![30]);
        let game = harness.game(2).await;
        let (_, scene) = harness.active_scene(&game).await;
        let submission = handle_submit_fortune_roll(
            &submit(game.id, game.members[0], &scene, OddsTier::FiftyFifty),
            &harness.ctx(),
        )
        .await
        .unwrap();
        let later = submission.roll.expires_at;
        harness.set_now(later);
        let gateway = OpenOnlyGateway::new(&harness.store);

        // Act
        let roll = resolve_fortune_roll_if_due(game.id, submission.roll.id, &harness.ctx(), &gateway)
            .await
            .unwrap();

        // Assert
        assert_eq!(roll.result, Some(FortuneOutcome::Yes));
        let arena = harness.arena(game.id).await;
        let beat = arena.beat(roll.beat_id).unwrap();
        assert_eq!(beat.status, BeatStatus::Canon);
        assert_eq!(beat.significance, Significance::Minor);
        assert!(arena.proposals().is_empty());
    }

    #[tokio::test]
    async fn test_exceptional_result_sends_beat_to_vote() {
        // Arrange
        let mut harness = Harness::with_draws(vec![0]);
        let game = harness.game(2).await;
        let (_, scene) = harness.active_scene(&game).await;
        let author = game.members[1];
        let submission = handle_submit_fortune_roll(
            &submit(game.id, author, &scene, OddsTier::FiftyFifty),
            &harness.ctx(),
        )
        .await
        .unwrap();
        let later = submission.roll.expires_at + Duration::minutes(5);
        harness.set_now(later);
        let gateway = OpenOnlyGateway::new(&harness.store);

        // Act
        let roll = resolve_fortune_roll_if_due(game.id, submission.roll.id, &harness.ctx(), &gateway)
            .await
            .unwrap();

        // Assert
        assert_eq!(roll.result, Some(FortuneOutcome::ExceptionalYes));
        let arena = harness.arena(game.id).await;
        let beat = arena.beat(roll.beat_id).unwrap();
        assert_eq!(beat.significance, Significance::Major);
        assert_eq!(beat.status, BeatStatus::Proposed);
        let proposal = arena.latest_beat_proposal(beat.id).unwrap();
        assert_eq!(proposal.proposal_type(), ProposalType::BeatProposal);
        assert_eq!(proposal.proposer_id, Some(author));
        assert_eq!(proposal.expires_at, Some(later + Duration::hours(12)));
        assert_eq!(arena.votes_on(proposal.id).len(), 1);
    }

    #[tokio::test]
    async fn test_roll_is_not_resolved_before_window_ends() {
        let harness = Harness::with_draws(vec![]);
        let game = harness.game(1).await;
        let (_, scene) = harness.active_scene(&game).await;
        let submission = handle_submit_fortune_roll(
            &submit(game.id, game.members[0], &scene, OddsTier::Likely),
            &harness.ctx(),
        )
        .await
        .unwrap();
        let gateway = OpenOnlyGateway::new(&harness.store);

        let roll = resolve_fortune_roll_if_due(game.id, submission.roll.id, &harness.ctx(), &gateway)
            .await
            .unwrap();

        assert!(roll.is_pending());
    }

    #[tokio::test]
    async fn test_contest_halts_resolution_and_notifies_invoker() {
        // Arrange
        let mut harness = Harness::with_draws(vec![]);
        let game = harness.game(2).await;
        let (_, scene) = harness.active_scene(&game).await;
        let submission = handle_submit_fortune_roll(
            &submit(game.id, game.members[0], &scene, OddsTier::Likely),
            &harness.ctx(),
        )
        .await
        .unwrap();

        // Act
        let contested = handle_contest_fortune_roll(
            &contest(game.id, game.members[1], submission.roll.id),
            &harness.ctx(),
        )
        .await
        .unwrap();
        let later = submission.roll.expires_at + Duration::days(3);
        harness.set_now(later);
        let gateway = OpenOnlyGateway::new(&harness.store);
        let resolved = resolve_due_fortune_rolls(game.id, &harness.ctx(), &gateway)
            .await
            .unwrap();

        // Assert
        assert!(contested.contested);
        assert!(resolved.is_empty());
        let sent = harness.notifier.sent_of(NotificationKind::FortuneRollContested);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipients, vec![game.members[0]]);
    }

    #[tokio::test]
    async fn test_contest_twice_is_invalid() {
        let harness = Harness::new();
        let game = harness.game(2).await;
        let (_, scene) = harness.active_scene(&game).await;
        let submission = handle_submit_fortune_roll(
            &submit(game.id, game.members[0], &scene, OddsTier::Likely),
            &harness.ctx(),
        )
        .await
        .unwrap();
        handle_contest_fortune_roll(&contest(game.id, game.members[1], submission.roll.id), &harness.ctx())
            .await
            .unwrap();

        let err = handle_contest_fortune_roll(
            &contest(game.id, game.members[0], submission.roll.id),
            &harness.ctx(),
        )
        .await
        .unwrap_err();

        match err {
            DomainError::InvalidState(msg) => assert!(msg.contains("already contested")),
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reaffirm_restarts_window() {
        // Arrange
        let mut harness = Harness::with_draws(vec![60]);
        let game = harness.game(2).await;
        let (_, scene) = harness.active_scene(&game).await;
        let invoker = game.members[0];
        let submission = handle_submit_fortune_roll(
            &submit(game.id, invoker, &scene, OddsTier::FiftyFifty),
            &harness.ctx(),
        )
        .await
        .unwrap();
        handle_contest_fortune_roll(&contest(game.id, game.members[1], submission.roll.id), &harness.ctx())
            .await
            .unwrap();
        let reaffirmed_at = harness.clock.0 + Duration::hours(10);
        harness.set_now(reaffirmed_at);

        // Act
        let roll = handle_reaffirm_fortune_roll(&reaffirm(game.id, invoker, submission.roll.id), &harness.ctx())
            .await
            .unwrap();

        // Assert
        assert!(!roll.contested);
        assert_eq!(roll.expires_at, reaffirmed_at + Duration::hours(6));

        let due_at = roll.expires_at;
        harness.set_now(due_at);
        let gateway = OpenOnlyGateway::new(&harness.store);
        let resolved = resolve_due_fortune_rolls(game.id, &harness.ctx(), &gateway)
            .await
            .unwrap();
        assert_eq!(resolved, vec![roll.id]);
        let arena = harness.arena(game.id).await;
        assert_eq!(arena.fortune_roll(roll.id).unwrap().result, Some(FortuneOutcome::No));
    }

    #[tokio::test]
    async fn test_reaffirm_by_other_member_is_forbidden() {
        let harness = Harness::new();
        let game = harness.game(2).await;
        let (_, scene) = harness.active_scene(&game).await;
        let submission = handle_submit_fortune_roll(
            &submit(game.id, game.members[0], &scene, OddsTier::Likely),
            &harness.ctx(),
        )
        .await
        .unwrap();
        handle_contest_fortune_roll(&contest(game.id, game.members[1], submission.roll.id), &harness.ctx())
            .await
            .unwrap();

        let err = handle_reaffirm_fortune_roll(
            &reaffirm(game.id, game.members[1], submission.roll.id),
            &harness.ctx(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DomainError::Forbidden(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_reaffirm_uncontested_roll_is_invalid() {
        let harness = Harness::new();
        let game = harness.game(1).await;
        let (_, scene) = harness.active_scene(&game).await;
        let submission = handle_submit_fortune_roll(
            &submit(game.id, game.members[0], &scene, OddsTier::Likely),
            &harness.ctx(),
        )
        .await
        .unwrap();

        let err = handle_reaffirm_fortune_roll(
            &reaffirm(game.id, game.members[0], submission.roll.id),
            &harness.ctx(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DomainError::InvalidState(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_resolved_roll_cannot_be_contested() {
        let mut harness = Harness::with_draws(vec![40]);
        let game = harness.game(2).await;
        let (_, scene) = harness.active_scene(&game).await;
        let submission = handle_submit_fortune_roll(
            &submit(game.id, game.members[0], &scene, OddsTier::Likely),
            &harness.ctx(),
        )
        .await
        .unwrap();
        let later = submission.roll.expires_at;
        harness.set_now(later);
        let gateway = OpenOnlyGateway::new(&harness.store);
        resolve_due_fortune_rolls(game.id, &harness.ctx(), &gateway)
            .await
            .unwrap();

        let err = handle_contest_fortune_roll(
            &contest(game.id, game.members[1], submission.roll.id),
            &harness.ctx(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DomainError::InvalidState(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_resolve_due_propagates_store_failure() {
        let harness = Harness::new();
        let ctx = EngineContext {
            store: &FailingStore,
            ..harness.ctx()
        };
        let gateway = OpenOnlyGateway::new(&FailingStore);

        let err = resolve_due_fortune_rolls(Uuid::new_v4(), &ctx, &gateway)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Infrastructure(_)), "got {err:?}");
    }
}
