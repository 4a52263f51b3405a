//! Test harness: owned collaborators plus helpers for seeding a game.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use loom_core::arena::GameArena;
use loom_core::assistant::StoryAssistant;
use loom_core::changeset::{Changeset, Write};
use loom_core::context::EngineContext;
use loom_core::model::{
    Act, Beat, BeatEvent, BeatStatus, Game, GameSettings, GameStatus, Scene, Significance,
    StoryStatus, Tension,
};
use loom_core::repository::NarrativeStore;
use loom_core::rng::DeterministicRng;
use loom_store::MemoryStore;
use uuid::Uuid;

use crate::assistant::ScriptedAssistant;
use crate::clock::{FixedClock, fixed_now};
use crate::notifier::RecordingNotifier;
use crate::rng::{MockRng, SequenceRng};

/// Everything a handler needs, backed by an in-memory store.
pub struct Harness {
    /// Current time; tests move it forward to pass deadlines.
    pub clock: FixedClock,
    /// Random source.
    pub rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    /// Store.
    pub store: MemoryStore,
    /// Story assistant.
    pub assistant: Arc<dyn StoryAssistant>,
    /// Notification recorder.
    pub notifier: RecordingNotifier,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    /// A harness at [`fixed_now`] with a `MockRng` and a scripted assistant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: FixedClock(fixed_now()),
            rng: Arc::new(Mutex::new(MockRng)),
            store: MemoryStore::new(),
            assistant: Arc::new(ScriptedAssistant::default()),
            notifier: RecordingNotifier::new(),
        }
    }

    /// A harness whose RNG yields `values` in order.
    #[must_use]
    pub fn with_draws(values: Vec<u32>) -> Self {
        Self {
            rng: Arc::new(Mutex::new(SequenceRng::new(values))),
            ..Self::new()
        }
    }

    /// Replaces the assistant.
    #[must_use]
    pub fn with_assistant(mut self, assistant: impl StoryAssistant + 'static) -> Self {
        self.assistant = Arc::new(assistant);
        self
    }

    /// Moves the clock.
    pub fn set_now(&mut self, now: DateTime<Utc>) {
        self.clock = FixedClock(now);
    }

    /// Borrows the collaborators as an engine context.
    #[must_use]
    pub fn ctx(&self) -> EngineContext<'_> {
        EngineContext {
            clock: &self.clock,
            rng: &*self.rng,
            store: &self.store,
            assistant: &*self.assistant,
            notifier: &self.notifier,
        }
    }

    /// Loads the current arena of a game.
    ///
    /// # Panics
    ///
    /// Panics if the game does not exist.
    pub async fn arena(&self, game_id: Uuid) -> GameArena {
        self.store.load_arena(game_id).await.unwrap()
    }

    /// Creates an active game with `members` participants and default
    /// settings.
    ///
    /// # Panics
    ///
    /// Panics if the store rejects the game.
    pub async fn game(&self, members: usize) -> Game {
        self.game_with(members, GameStatus::Active, GameSettings::default())
            .await
    }

    /// Creates a game with explicit status and settings.
    ///
    /// # Panics
    ///
    /// Panics if the store rejects the game.
    pub async fn game_with(
        &self,
        members: usize,
        status: GameStatus,
        settings: GameSettings,
    ) -> Game {
        let game = Game {
            id: Uuid::new_v4(),
            name: "The Salt Road".to_owned(),
            status,
            members: (0..members).map(|_| Uuid::new_v4()).collect(),
            settings,
            created_at: self.clock.0,
        };
        self.store.create_game(&game).await.unwrap();
        game
    }

    /// Adds an act with the given status.
    ///
    /// # Panics
    ///
    /// Panics if the commit fails.
    pub async fn act(&self, game: &Game, status: StoryStatus) -> Act {
        let arena = self.arena(game.id).await;
        let act = Act {
            id: Uuid::new_v4(),
            title: format!("Act {}", arena.next_act_order()),
            guiding_question: "What does the city owe its dead?".to_owned(),
            status,
            order: arena.next_act_order(),
            narrative: None,
        };
        self.write(game.id, Write::Act(act.clone())).await;
        act
    }

    /// Adds a scene with the given status to an act.
    ///
    /// # Panics
    ///
    /// Panics if the commit fails.
    pub async fn scene(&self, game: &Game, act: &Act, status: StoryStatus) -> Scene {
        let arena = self.arena(game.id).await;
        let scene = Scene {
            id: Uuid::new_v4(),
            act_id: act.id,
            guiding_question: "Who opened the floodgates?".to_owned(),
            location: Some("The lower docks".to_owned()),
            status,
            order: arena.next_scene_order(act.id),
            tension: game.settings.starting_tension,
            tension_carry_forward: None,
            narrative: None,
        };
        self.write(game.id, Write::Scene(scene.clone())).await;
        scene
    }

    /// Adds an active act holding one active scene.
    ///
    /// # Panics
    ///
    /// Panics if a commit fails.
    pub async fn active_scene(&self, game: &Game) -> (Act, Scene) {
        let act = self.act(game, StoryStatus::Active).await;
        let scene = self.scene(game, &act, StoryStatus::Active).await;
        (act, scene)
    }

    /// Adds a minor canon beat.
    ///
    /// # Panics
    ///
    /// Panics if the commit fails.
    pub async fn canon_beat(&self, game: &Game, scene: &Scene, author_id: Uuid) -> Beat {
        self.beat(game, scene, author_id, BeatStatus::Canon).await
    }

    /// Adds a minor beat in the given status.
    ///
    /// # Panics
    ///
    /// Panics if the commit fails.
    pub async fn beat(
        &self,
        game: &Game,
        scene: &Scene,
        author_id: Uuid,
        status: BeatStatus,
    ) -> Beat {
        let arena = self.arena(game.id).await;
        let beat = Beat {
            id: Uuid::new_v4(),
            scene_id: scene.id,
            author_id,
            order: arena.next_beat_order(scene.id),
            significance: Significance::Minor,
            status,
            events: vec![BeatEvent::Narrative {
                content: "The lantern gutters as the door creaks open.".to_owned(),
            }],
            challenge_reason: None,
            challenged_by_id: None,
            challenge_outcome: None,
            created_at: self.clock.0,
        };
        self.write(game.id, Write::Beat(beat.clone())).await;
        beat
    }

    /// Sets a scene's tension directly.
    ///
    /// # Panics
    ///
    /// Panics if the scene is unknown or the commit fails.
    pub async fn set_tension(&self, game: &Game, scene_id: Uuid, tension: i32) -> Scene {
        let arena = self.arena(game.id).await;
        let mut scene = arena.scene(scene_id).unwrap().clone();
        scene.tension = Tension::new(tension).unwrap();
        self.write(game.id, Write::Scene(scene.clone())).await;
        scene
    }

    async fn write(&self, game_id: Uuid, write: Write) {
        let mut changeset = Changeset::new(game_id);
        changeset.writes.push(write);
        self.store.commit(&changeset).await.unwrap();
    }
}
