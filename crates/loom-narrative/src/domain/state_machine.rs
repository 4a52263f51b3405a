//! Transitions of the Act → Scene → Beat lifecycle.
//!
//! Each function stages its writes on a [`UnitOfWork`]; nothing is
//! persisted until the caller commits. Activation keeps the invariants that
//! a game has at most one active act and an act at most one active scene,
//! and is idempotent.

use loom_core::changeset::{UnitOfWork, Write};
use loom_core::error::DomainError;
use loom_core::model::{BeatStatus, GameStatus, StoryStatus, Tension};
use uuid::Uuid;

/// Work that runs after a completion has been committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    /// A scene finished: ask for a tension vote and compile its narrative.
    SceneCompleted {
        /// The finished scene.
        scene_id: Uuid,
    },
    /// An act finished: compile its narrative.
    ActCompleted {
        /// The finished act.
        act_id: Uuid,
    },
}

/// Starts play.
///
/// # Errors
///
/// Returns a staging error from the unit of work.
pub fn activate_game(uow: &mut UnitOfWork) -> Result<(), DomainError> {
    let mut game = uow.arena().game().clone();
    if game.status == GameStatus::Active {
        return Ok(());
    }
    game.status = GameStatus::Active;
    uow.stage(Write::Game(game))
}

fn close_act(uow: &mut UnitOfWork, act_id: Uuid) -> Result<(), DomainError> {
    let active_scenes: Vec<Uuid> = uow
        .arena()
        .scenes_of(act_id)
        .into_iter()
        .filter(|scene| scene.status == StoryStatus::Active)
        .map(|scene| scene.id)
        .collect();
    for scene_id in active_scenes {
        let mut scene = uow.arena().scene(scene_id)?.clone();
        scene.status = StoryStatus::Complete;
        uow.stage(Write::Scene(scene))?;
    }
    let mut act = uow.arena().act(act_id)?.clone();
    act.status = StoryStatus::Complete;
    uow.stage(Write::Act(act))
}

/// Makes an act the active one, completing any other active act and its
/// active scenes.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the act does not exist, or
/// `InvalidState` if it is already complete.
pub fn activate_act(uow: &mut UnitOfWork, act_id: Uuid) -> Result<(), DomainError> {
    let act = uow.arena().act(act_id)?.clone();
    match act.status {
        StoryStatus::Active => return Ok(()),
        StoryStatus::Complete => {
            return Err(DomainError::invalid_state("a completed act cannot be reopened"));
        }
        StoryStatus::Proposed => {}
    }

    let others: Vec<Uuid> = uow
        .arena()
        .acts()
        .into_iter()
        .filter(|other| other.status == StoryStatus::Active && other.id != act_id)
        .map(|other| other.id)
        .collect();
    for other in others {
        close_act(uow, other)?;
    }

    let mut act = act;
    act.status = StoryStatus::Active;
    uow.stage(Write::Act(act))
}

/// Completes an act and every active scene in it. Returns `None` if the act
/// was already complete.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the act does not exist.
pub fn complete_act(uow: &mut UnitOfWork, act_id: Uuid) -> Result<Option<FollowUp>, DomainError> {
    if uow.arena().act(act_id)?.status == StoryStatus::Complete {
        return Ok(None);
    }
    close_act(uow, act_id)?;
    Ok(Some(FollowUp::ActCompleted { act_id }))
}

/// Makes a scene the active one in its act, completing the previously
/// active sibling.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the scene does not exist, or
/// `InvalidState` if it is already complete or its act is not active.
pub fn activate_scene(uow: &mut UnitOfWork, scene_id: Uuid) -> Result<(), DomainError> {
    let scene = uow.arena().scene(scene_id)?.clone();
    match scene.status {
        StoryStatus::Active => return Ok(()),
        StoryStatus::Complete => {
            return Err(DomainError::invalid_state(
                "a completed scene cannot be reopened",
            ));
        }
        StoryStatus::Proposed => {}
    }
    if uow.arena().act(scene.act_id)?.status != StoryStatus::Active {
        return Err(DomainError::invalid_state(
            "a scene can only open in an active act",
        ));
    }

    let siblings: Vec<Uuid> = uow
        .arena()
        .scenes_of(scene.act_id)
        .into_iter()
        .filter(|other| other.status == StoryStatus::Active && other.id != scene_id)
        .map(|other| other.id)
        .collect();
    for sibling_id in siblings {
        let mut sibling = uow.arena().scene(sibling_id)?.clone();
        sibling.status = StoryStatus::Complete;
        uow.stage(Write::Scene(sibling))?;
    }

    let mut scene = scene;
    scene.status = StoryStatus::Active;
    uow.stage(Write::Scene(scene))
}

/// Completes a scene. Returns `None` if it was already complete.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the scene does not exist.
pub fn complete_scene(
    uow: &mut UnitOfWork,
    scene_id: Uuid,
) -> Result<Option<FollowUp>, DomainError> {
    let mut scene = uow.arena().scene(scene_id)?.clone();
    if scene.status == StoryStatus::Complete {
        return Ok(None);
    }
    scene.status = StoryStatus::Complete;
    uow.stage(Write::Scene(scene))?;
    Ok(Some(FollowUp::SceneCompleted { scene_id }))
}

/// Makes a proposed or approved beat canon.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the beat does not exist, or
/// `InvalidState` if it is in any other status.
pub fn canonize_beat(uow: &mut UnitOfWork, beat_id: Uuid) -> Result<(), DomainError> {
    let mut beat = uow.arena().beat(beat_id)?.clone();
    match beat.status {
        BeatStatus::Canon => Ok(()),
        BeatStatus::Proposed | BeatStatus::Approved => {
            beat.status = BeatStatus::Canon;
            uow.stage(Write::Beat(beat))
        }
        other => Err(DomainError::invalid_state(format!(
            "a {} beat cannot become canon",
            other.as_str()
        ))),
    }
}

/// Moves a scene's tension by `delta`, clamped to 1–9, and records it as
/// the tension the next scene inherits.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the scene does not exist.
pub fn apply_tension_delta(
    uow: &mut UnitOfWork,
    scene_id: Uuid,
    delta: i32,
) -> Result<Tension, DomainError> {
    let mut scene = uow.arena().scene(scene_id)?.clone();
    let tension = scene.tension.shifted(delta);
    scene.tension = tension;
    scene.tension_carry_forward = Some(tension);
    uow.stage(Write::Scene(scene))?;
    Ok(tension)
}
