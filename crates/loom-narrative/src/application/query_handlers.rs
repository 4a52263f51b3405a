//! Query handlers for the narrative context.
//!
//! Views are built from a freshly loaded arena. Callers that want
//! expired decisions settled first run the lazy resolvers before reading.

use chrono::{DateTime, Utc};
use loom_core::arena::GameArena;
use loom_core::error::DomainError;
use loom_core::model::{
    Act, Beat, BeatComment, GameSettings, GameStatus, Proposal, ProposalStatus, ProposalSubject,
    ProposalType, Scene, VoteTally,
};
use loom_core::repository::NarrativeStore;
use serde::Serialize;
use uuid::Uuid;

/// Read-only view of a proposal with its running tally.
#[derive(Debug, Clone, Serialize)]
pub struct ProposalView {
    /// Proposal identifier.
    pub id: Uuid,
    /// Flat type.
    pub proposal_type: ProposalType,
    /// What is decided, with its target.
    pub subject: ProposalSubject,
    /// Open or approved.
    pub status: ProposalStatus,
    /// Who proposed it; `None` for system proposals.
    pub proposer_id: Option<Uuid>,
    /// Silence-timer deadline.
    pub expires_at: Option<DateTime<Utc>>,
    /// Votes so far.
    pub tally: VoteTally,
    /// Members whose votes count.
    pub participants: usize,
}

impl ProposalView {
    /// Builds the view of `proposal` from the arena it lives in.
    #[must_use]
    pub fn from_arena(arena: &GameArena, proposal: &Proposal) -> Self {
        Self {
            id: proposal.id,
            proposal_type: proposal.proposal_type(),
            subject: proposal.subject.clone(),
            status: proposal.status,
            proposer_id: proposal.proposer_id,
            expires_at: proposal.expires_at,
            tally: VoteTally::count(arena.votes_on(proposal.id)),
            participants: arena.game().participant_count(),
        }
    }
}

/// An act with its scenes.
#[derive(Debug, Serialize)]
pub struct ActView {
    /// The act.
    #[serde(flatten)]
    pub act: Act,
    /// Its scenes, in order.
    pub scenes: Vec<Scene>,
}

/// Read-only view of a whole game.
#[derive(Debug, Serialize)]
pub struct GameView {
    /// Game identifier.
    pub game_id: Uuid,
    /// Display name.
    pub name: String,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Participating users.
    pub members: Vec<Uuid>,
    /// Decision policy.
    pub settings: GameSettings,
    /// Acts, in order.
    pub acts: Vec<ActView>,
    /// Every pending decision.
    pub open_proposals: Vec<ProposalView>,
}

/// A beat with its challenge discussion.
#[derive(Debug, Serialize)]
pub struct BeatView {
    /// The beat.
    #[serde(flatten)]
    pub beat: Beat,
    /// Comments, oldest first.
    pub comments: Vec<BeatComment>,
}

/// Read-only view of one scene and its beats.
#[derive(Debug, Serialize)]
pub struct SceneView {
    /// The scene.
    pub scene: Scene,
    /// Beats, in order.
    pub beats: Vec<BeatView>,
    /// Pending decisions about this scene or its beats.
    pub open_proposals: Vec<ProposalView>,
}

fn open_proposals(arena: &GameArena, relevant: impl Fn(&Proposal) -> bool) -> Vec<ProposalView> {
    arena
        .proposals()
        .into_iter()
        .filter(|proposal| proposal.is_open() && relevant(proposal))
        .map(|proposal| ProposalView::from_arena(arena, proposal))
        .collect()
}

/// Builds the view of a game.
#[must_use]
pub fn game_view(arena: &GameArena) -> GameView {
    let game = arena.game();
    GameView {
        game_id: game.id,
        name: game.name.clone(),
        status: game.status,
        members: game.members.clone(),
        settings: game.settings.clone(),
        acts: arena
            .acts()
            .into_iter()
            .map(|act| ActView {
                act: act.clone(),
                scenes: arena.scenes_of(act.id).into_iter().cloned().collect(),
            })
            .collect(),
        open_proposals: open_proposals(arena, |_| true),
    }
}

/// Builds the view of a scene.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the scene is not part of the game.
pub fn scene_view(arena: &GameArena, scene_id: Uuid) -> Result<SceneView, DomainError> {
    let scene = arena.scene(scene_id)?.clone();
    let beats: Vec<BeatView> = arena
        .beats_of(scene_id)
        .into_iter()
        .map(|beat| BeatView {
            beat: beat.clone(),
            comments: arena.comments_on_beat(beat.id).into_iter().cloned().collect(),
        })
        .collect();
    let open_proposals = open_proposals(arena, |proposal| match proposal.subject {
        ProposalSubject::SceneComplete { scene_id: id }
        | ProposalSubject::SceneProposal { scene_id: id }
        | ProposalSubject::TensionAdjustment { scene_id: id, .. } => id == scene_id,
        ProposalSubject::BeatProposal { beat_id } => beats.iter().any(|b| b.beat.id == beat_id),
        _ => false,
    });
    Ok(SceneView {
        scene,
        beats,
        open_proposals,
    })
}

/// Retrieves a game by id.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the game does not exist.
pub async fn get_game_view(
    game_id: Uuid,
    store: &dyn NarrativeStore,
) -> Result<GameView, DomainError> {
    let arena = store.load_arena(game_id).await?;
    Ok(game_view(&arena))
}

/// Retrieves a scene with its beats.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the game or scene does not exist.
pub async fn get_scene_view(
    game_id: Uuid,
    scene_id: Uuid,
    store: &dyn NarrativeStore,
) -> Result<SceneView, DomainError> {
    let arena = store.load_arena(game_id).await?;
    scene_view(&arena, scene_id)
}
