//! Command handlers for the narrative context.
//!
//! Each handler loads the game, validates the command, stages its writes
//! and commits them, handing the unit of work to the proposal gateway when
//! the change needs a vote. Notifications go out only after the commit.

use loom_core::changeset::Write;
use loom_core::context::EngineContext;
use loom_core::error::DomainError;
use loom_core::gateway::{ProposalDraft, ProposalGateway, ProposalOutcome};
use loom_core::model::{
    Act, Beat, BeatComment, BeatEvent, BeatStatus, Game, GameStatus, ProposalSubject, Scene,
    Significance, SignificanceThreshold, StoryStatus, Tension,
};
use loom_core::notification::{Notification, NotificationKind, excerpt, scene_link};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::beat_lifecycle::{self, non_empty};
use crate::domain::commands::{
    AcceptChallenge, BeatEventInput, ChallengeBeat, CommentOnBeat, CreateGame, DismissChallenge,
    ProposeAct, ProposeActComplete, ProposeScene, ProposeSceneComplete, SubmitBeat,
};
use crate::domain::dice::DiceNotation;

/// Result of submitting a beat.
#[derive(Debug, Clone, Serialize)]
pub struct BeatSubmission {
    /// The beat as committed.
    pub beat: Beat,
    /// The vote a major beat went to.
    pub proposal: Option<ProposalOutcome>,
}

/// Result of accepting a challenge.
#[derive(Debug, Clone, Serialize)]
pub struct BeatRevision {
    /// The revised beat.
    pub beat: Beat,
    /// The fresh vote on the revision.
    pub proposal: ProposalOutcome,
}

/// Asks the assistant whether `text` is minor or major, unless the game
/// leaves that to authors. Failures count as minor.
pub async fn classify_significance(ctx: &EngineContext<'_>, game: &Game, text: &str) -> Significance {
    if game.settings.beat_significance_threshold == SignificanceThreshold::Minimal
        || text.trim().is_empty()
    {
        return Significance::Minor;
    }
    match ctx.assistant.classify_significance(text).await {
        Ok(significance) => significance,
        Err(e) => {
            warn!(game_id = %game.id, error = %e, "significance classification failed, treating beat as minor");
            Significance::Minor
        }
    }
}

/// A beat draft in `scene` with the next order, to be filled in by the
/// caller.
#[must_use]
pub fn draft_beat(
    ctx: &EngineContext<'_>,
    scene: &Scene,
    next_order: u32,
    author_id: Uuid,
    significance: Significance,
    events: Vec<BeatEvent>,
) -> Beat {
    Beat {
        id: Uuid::new_v4(),
        scene_id: scene.id,
        author_id,
        order: next_order,
        significance,
        status: match significance {
            Significance::Minor => BeatStatus::Canon,
            Significance::Major => BeatStatus::Proposed,
        },
        events,
        challenge_reason: None,
        challenged_by_id: None,
        challenge_outcome: None,
        created_at: ctx.clock.now(),
    }
}

/// Rejects scenes that are not being played.
///
/// # Errors
///
/// Returns `DomainError::InvalidState` unless the scene is active.
pub fn ensure_scene_active(scene: &Scene) -> Result<(), DomainError> {
    if scene.status == StoryStatus::Active {
        Ok(())
    } else {
        Err(DomainError::invalid_state(
            "beats can only be added to an active scene",
        ))
    }
}

fn build_events(
    ctx: &EngineContext<'_>,
    inputs: &[BeatEventInput],
) -> Result<Vec<BeatEvent>, DomainError> {
    if inputs.is_empty() {
        return Err(DomainError::validation("a beat must have at least one event"));
    }
    inputs
        .iter()
        .map(|input| match input {
            BeatEventInput::Narrative { content } => Ok(BeatEvent::Narrative {
                content: non_empty(content, "narrative event content")?,
            }),
            BeatEventInput::Ooc { content } => Ok(BeatEvent::Ooc {
                content: non_empty(content, "ooc event content")?,
            }),
            BeatEventInput::Roll { notation, reason } => {
                let dice: DiceNotation = notation.parse()?;
                let roll = ctx.with_rng(|rng| dice.roll(rng))?;
                Ok(BeatEvent::Roll {
                    notation: roll.notation,
                    result: roll.total,
                    reason: reason
                        .as_deref()
                        .map(str::trim)
                        .filter(|r| !r.is_empty())
                        .map(str::to_owned),
                })
            }
        })
        .collect()
}

/// Handles the `ProposeAct` command: creates a proposed act and opens the
/// vote on it.
///
/// # Errors
///
/// `Forbidden` for non-members, `InvalidState` unless the game is active,
/// `Validation` for a blank guiding question, `Conflict` if an act proposal
/// is already pending.
pub async fn handle_propose_act(
    command: &ProposeAct,
    ctx: &EngineContext<'_>,
    proposals: &dyn ProposalGateway,
) -> Result<ProposalOutcome, DomainError> {
    let mut uow = ctx.begin(command).await?;
    let game = uow.arena().game().clone();
    game.ensure_member(command.actor_id)?;
    game.ensure_active()?;
    let guiding_question = non_empty(&command.guiding_question, "guiding question")?;

    let order = uow.arena().next_act_order();
    let title = match command.title.trim() {
        "" => format!("Act {order}"),
        title => title.to_owned(),
    };
    let act = Act {
        id: Uuid::new_v4(),
        title,
        guiding_question,
        status: StoryStatus::Proposed,
        order,
        narrative: None,
    };
    uow.stage(Write::Act(act.clone()))?;

    let outcome = proposals
        .open_proposal(
            uow,
            ProposalDraft {
                subject: ProposalSubject::ActProposal { act_id: act.id },
                proposer_id: Some(command.actor_id),
                expires_at: None,
            },
        )
        .await?;
    info!(act_id = %act.id, auto_approved = outcome.auto_approved, "act proposed");
    Ok(outcome)
}

/// Handles the `ProposeScene` command: creates a proposed scene in the
/// active act and opens the vote on it.
///
/// # Errors
///
/// `Forbidden` for non-members, `InvalidState` unless the game and act are
/// active, `Validation` for a blank guiding question or out-of-range
/// tension, `Conflict` if a scene proposal is already pending.
pub async fn handle_propose_scene(
    command: &ProposeScene,
    ctx: &EngineContext<'_>,
    proposals: &dyn ProposalGateway,
) -> Result<ProposalOutcome, DomainError> {
    let mut uow = ctx.begin(command).await?;
    let game = uow.arena().game().clone();
    game.ensure_member(command.actor_id)?;
    game.ensure_active()?;
    if uow.arena().act(command.act_id)?.status != StoryStatus::Active {
        return Err(DomainError::invalid_state(
            "act must be active to propose a scene",
        ));
    }
    let guiding_question = non_empty(&command.guiding_question, "guiding question")?;
    let tension = match command.tension {
        Some(value) => Tension::new(value)?,
        None => uow
            .arena()
            .carried_tension()
            .unwrap_or(game.settings.starting_tension),
    };

    let scene = Scene {
        id: Uuid::new_v4(),
        act_id: command.act_id,
        guiding_question,
        location: command
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_owned),
        status: StoryStatus::Proposed,
        order: uow.arena().next_scene_order(command.act_id),
        tension,
        tension_carry_forward: None,
        narrative: None,
    };
    uow.stage(Write::Scene(scene.clone()))?;

    let outcome = proposals
        .open_proposal(
            uow,
            ProposalDraft {
                subject: ProposalSubject::SceneProposal { scene_id: scene.id },
                proposer_id: Some(command.actor_id),
                expires_at: None,
            },
        )
        .await?;
    info!(scene_id = %scene.id, %tension, auto_approved = outcome.auto_approved, "scene proposed");
    Ok(outcome)
}

/// Handles the `ProposeActComplete` command.
///
/// # Errors
///
/// `Forbidden` for non-members, `InvalidState` unless the act is active,
/// `Conflict` if its completion is already pending.
pub async fn handle_propose_act_complete(
    command: &ProposeActComplete,
    ctx: &EngineContext<'_>,
    proposals: &dyn ProposalGateway,
) -> Result<ProposalOutcome, DomainError> {
    let uow = ctx.begin(command).await?;
    let game = uow.arena().game();
    game.ensure_member(command.actor_id)?;
    game.ensure_active()?;
    if uow.arena().act(command.act_id)?.status != StoryStatus::Active {
        return Err(DomainError::invalid_state(
            "act must be active to propose completion",
        ));
    }

    proposals
        .open_proposal(
            uow,
            ProposalDraft {
                subject: ProposalSubject::ActComplete {
                    act_id: command.act_id,
                },
                proposer_id: Some(command.actor_id),
                expires_at: None,
            },
        )
        .await
}

/// Handles the `ProposeSceneComplete` command.
///
/// # Errors
///
/// `Forbidden` for non-members, `InvalidState` unless the scene is active,
/// `Conflict` if its completion is already pending.
pub async fn handle_propose_scene_complete(
    command: &ProposeSceneComplete,
    ctx: &EngineContext<'_>,
    proposals: &dyn ProposalGateway,
) -> Result<ProposalOutcome, DomainError> {
    let uow = ctx.begin(command).await?;
    let game = uow.arena().game();
    game.ensure_member(command.actor_id)?;
    game.ensure_active()?;
    if uow.arena().scene(command.scene_id)?.status != StoryStatus::Active {
        return Err(DomainError::invalid_state(
            "scene must be active to propose completion",
        ));
    }

    proposals
        .open_proposal(
            uow,
            ProposalDraft {
                subject: ProposalSubject::SceneComplete {
                    scene_id: command.scene_id,
                },
                proposer_id: Some(command.actor_id),
                expires_at: None,
            },
        )
        .await
}

/// Handles the `SubmitBeat` command. Minor beats become canon at once;
/// major beats go to a vote with the silence timer running.
///
/// # Errors
///
/// `Forbidden` for non-members, `InvalidState` unless the scene is active,
/// `Validation` for empty beats, blank content or bad dice notation.
pub async fn handle_submit_beat(
    command: &SubmitBeat,
    ctx: &EngineContext<'_>,
    proposals: &dyn ProposalGateway,
) -> Result<BeatSubmission, DomainError> {
    let mut uow = ctx.begin(command).await?;
    let game = uow.arena().game().clone();
    game.ensure_member(command.actor_id)?;
    game.ensure_active()?;
    let scene = uow.arena().scene(command.scene_id)?.clone();
    ensure_scene_active(&scene)?;

    let events = build_events(ctx, &command.events)?;
    let order = uow.arena().next_beat_order(scene.id);
    let mut beat = draft_beat(ctx, &scene, order, command.actor_id, Significance::Minor, events);
    let significance = match command.significance {
        Some(significance) => significance,
        None => classify_significance(ctx, &game, &beat.prose()).await,
    };
    beat.significance = significance;
    if significance == Significance::Major {
        beat.status = BeatStatus::Proposed;
    }
    let beat_id = beat.id;
    uow.stage(Write::Beat(beat))?;

    let (beat, proposal) = match significance {
        Significance::Major => {
            let outcome = proposals
                .open_proposal(
                    uow,
                    ProposalDraft {
                        subject: ProposalSubject::BeatProposal { beat_id },
                        proposer_id: Some(command.actor_id),
                        expires_at: Some(ctx.clock.hours_from_now(game.settings.silence_timer_hours)),
                    },
                )
                .await?;
            (outcome.arena.beat(beat_id)?.clone(), Some(outcome))
        }
        Significance::Minor => {
            let arena = uow.commit(ctx.store).await?;
            (arena.beat(beat_id)?.clone(), None)
        }
    };

    ctx.notifier.notify(
        Notification::to_members(
            &game,
            Some(command.actor_id),
            NotificationKind::NewBeat,
            "A new beat was submitted",
        )
        .with_link(scene_link(game.id, scene.id)),
    );
    info!(beat_id = %beat.id, significance = ?beat.significance, status = beat.status.as_str(), "beat submitted");
    Ok(BeatSubmission { beat, proposal })
}

/// Handles the `ChallengeBeat` command.
///
/// # Errors
///
/// `Forbidden` for non-members, `Validation` for a blank reason,
/// `InvalidState` unless the beat is canon, `Conflict` if the beat changed
/// concurrently.
pub async fn handle_challenge_beat(
    command: &ChallengeBeat,
    ctx: &EngineContext<'_>,
) -> Result<Beat, DomainError> {
    let mut uow = ctx.begin(command).await?;
    let game = uow.arena().game().clone();
    game.ensure_member(command.actor_id)?;

    let beat = beat_lifecycle::challenge(&mut uow, command.beat_id, command.actor_id, &command.reason)?;
    uow.commit(ctx.store).await?;

    if beat.author_id != command.actor_id {
        let reason = beat.challenge_reason.as_deref().unwrap_or_default();
        ctx.notifier.notify(
            Notification::to_user(
                game.id,
                beat.author_id,
                NotificationKind::BeatChallenged,
                format!("Your beat was challenged: \"{}\"", excerpt(reason)),
            )
            .with_link(scene_link(game.id, beat.scene_id)),
        );
    }
    info!(beat_id = %beat.id, "beat challenged");
    Ok(beat)
}

/// Handles the `AcceptChallenge` command: the author revises the beat and
/// it goes back to a vote.
///
/// # Errors
///
/// `Forbidden` for anyone but the author, `InvalidState` unless the beat is
/// challenged, `Validation` for blank prose.
pub async fn handle_accept_challenge(
    command: &AcceptChallenge,
    ctx: &EngineContext<'_>,
    proposals: &dyn ProposalGateway,
) -> Result<BeatRevision, DomainError> {
    let mut uow = ctx.begin(command).await?;
    let game = uow.arena().game().clone();
    game.ensure_member(command.actor_id)?;

    let revised = beat_lifecycle::accept_revision(
        &mut uow,
        command.beat_id,
        command.actor_id,
        &command.revised_content,
    )?;
    let outcome = proposals
        .open_proposal(
            uow,
            ProposalDraft {
                subject: ProposalSubject::BeatProposal {
                    beat_id: revised.id,
                },
                proposer_id: Some(command.actor_id),
                expires_at: Some(ctx.clock.hours_from_now(game.settings.silence_timer_hours)),
            },
        )
        .await?;
    let beat = outcome.arena.beat(revised.id)?.clone();

    ctx.notifier.notify(
        Notification::to_members(
            &game,
            Some(command.actor_id),
            NotificationKind::BeatRevised,
            "A challenged beat was revised and needs your vote",
        )
        .with_link(scene_link(game.id, beat.scene_id)),
    );
    info!(beat_id = %beat.id, status = beat.status.as_str(), "challenge accepted");
    Ok(BeatRevision {
        beat,
        proposal: outcome,
    })
}

/// Handles the `DismissChallenge` command.
///
/// # Errors
///
/// `Forbidden` for anyone but the author, `InvalidState` unless the beat is
/// challenged.
pub async fn handle_dismiss_challenge(
    command: &DismissChallenge,
    ctx: &EngineContext<'_>,
) -> Result<Beat, DomainError> {
    let mut uow = ctx.begin(command).await?;
    let game = uow.arena().game().clone();
    game.ensure_member(command.actor_id)?;

    let beat = beat_lifecycle::dismiss(&mut uow, command.beat_id, command.actor_id)?;
    uow.commit(ctx.store).await?;

    if let Some(challenger_id) = beat.challenged_by_id {
        ctx.notifier.notify(
            Notification::to_user(
                game.id,
                challenger_id,
                NotificationKind::ChallengeDismissed,
                "Your challenge was dismissed by the author",
            )
            .with_link(scene_link(game.id, beat.scene_id)),
        );
    }
    info!(beat_id = %beat.id, "challenge dismissed");
    Ok(beat)
}

/// Handles the `CommentOnBeat` command.
///
/// # Errors
///
/// `Forbidden` for non-members, `InvalidState` unless the beat is
/// challenged, `Validation` for blank text.
pub async fn handle_comment_on_beat(
    command: &CommentOnBeat,
    ctx: &EngineContext<'_>,
) -> Result<BeatComment, DomainError> {
    let mut uow = ctx.begin(command).await?;
    let game = uow.arena().game().clone();
    game.ensure_member(command.actor_id)?;

    let comment = beat_lifecycle::comment(
        &mut uow,
        command.beat_id,
        command.actor_id,
        &command.content,
        ctx.clock.now(),
    )?;
    let arena = uow.commit(ctx.store).await?;
    let beat = arena.beat(command.beat_id)?;

    let mut recipients = vec![beat.author_id];
    recipients.extend(beat.challenged_by_id);
    recipients.dedup();
    recipients.retain(|user_id| *user_id != command.actor_id);
    if !recipients.is_empty() {
        ctx.notifier.notify(Notification {
            recipients,
            game_id: game.id,
            kind: NotificationKind::BeatCommentAdded,
            message: "New comment on a challenged beat".to_owned(),
            link: Some(scene_link(game.id, beat.scene_id)),
        });
    }
    Ok(comment)
}

/// Handles the `CreateGame` command. New games start in setup.
///
/// # Errors
///
/// `Validation` for a blank name or an empty member list, or the store's
/// error.
pub async fn handle_create_game(
    command: &CreateGame,
    ctx: &EngineContext<'_>,
) -> Result<Game, DomainError> {
    let name = non_empty(&command.name, "game name")?;
    let mut members: Vec<Uuid> = Vec::with_capacity(command.members.len());
    for member in &command.members {
        if !members.contains(member) {
            members.push(*member);
        }
    }
    if members.is_empty() {
        return Err(DomainError::validation("a game needs at least one member"));
    }
    let game = Game {
        id: command.game_id,
        name,
        status: GameStatus::Setup,
        members,
        settings: command.settings.clone(),
        created_at: ctx.clock.now(),
    };
    ctx.store.create_game(&game).await?;
    info!(game_id = %game.id, members = game.members.len(), "game created");
    Ok(game)
}
