use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::story::Tension;
use crate::error::DomainError;

/// Lifecycle of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// World building; only game-start proposals are possible.
    Setup,
    /// Play is underway.
    Active,
    /// Play is on hold.
    Paused,
    /// The story is finished.
    Archived,
}

/// Per-game policy for breaking tied votes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakingMethod {
    /// Pick uniformly among the tied options.
    #[default]
    Random,
    /// Defer to the proposer when they are the single tied winner.
    Proposer,
    /// Defer to the challenger; ties are still drawn at random.
    Challenger,
}

/// How eagerly beats are flagged as major by the story assistant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificanceThreshold {
    /// Flag most consequential beats.
    #[default]
    FlagMost,
    /// Flag only obviously major beats.
    FlagObvious,
    /// Never classify; authors choose.
    Minimal,
}

/// Configuration a game carries into every decision. Missing fields take
/// their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Tie-break policy for oracle selection.
    pub tie_breaking_method: TieBreakingMethod,
    /// Hours before an unanswered proposal escalates.
    pub silence_timer_hours: u32,
    /// Overrides the fortune roll contest window.
    pub fortune_roll_contest_window_hours: Option<u32>,
    /// Tension of the first scene.
    pub starting_tension: Tension,
    /// Beat significance classification policy.
    pub beat_significance_threshold: SignificanceThreshold,
    /// Stored for the product team; no enforcement path exists yet.
    pub max_consecutive_beats: u32,
    /// Compile scene and act narratives after completion.
    pub auto_generate_narrative: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            tie_breaking_method: TieBreakingMethod::Random,
            silence_timer_hours: 12,
            fortune_roll_contest_window_hours: None,
            starting_tension: Tension::NEUTRAL,
            beat_significance_threshold: SignificanceThreshold::FlagMost,
            max_consecutive_beats: 3,
            auto_generate_narrative: true,
        }
    }
}

/// A game: the owner of every act, scene, beat and decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    /// Game identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Current lifecycle status.
    pub status: GameStatus,
    /// Participating users, in join order.
    pub members: Vec<Uuid>,
    /// Decision policy.
    pub settings: GameSettings,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Game {
    /// Number of participants whose votes count.
    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if `user_id` plays in this game.
    #[must_use]
    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }

    /// Rejects users outside the game.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Forbidden` if `user_id` is not a member.
    pub fn ensure_member(&self, user_id: Uuid) -> Result<(), DomainError> {
        if self.is_member(user_id) {
            Ok(())
        } else {
            Err(DomainError::forbidden("you are not a member of this game"))
        }
    }

    /// Rejects commands that need a game in play.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` unless the game is active.
    pub fn ensure_active(&self) -> Result<(), DomainError> {
        if self.status == GameStatus::Active {
            Ok(())
        } else {
            Err(DomainError::invalid_state("game must be active"))
        }
    }

    /// Members other than `user_id`, in join order.
    #[must_use]
    pub fn members_except(&self, user_id: Uuid) -> Vec<Uuid> {
        self.members
            .iter()
            .copied()
            .filter(|member| *member != user_id)
            .collect()
    }

    /// Contest window for fortune rolls: the override, or half the silence
    /// timer with a floor of one hour.
    #[must_use]
    pub fn contest_window_hours(&self) -> u32 {
        self.settings
            .fortune_roll_contest_window_hours
            .unwrap_or_else(|| (self.settings.silence_timer_hours / 2).max(1))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn game(members: Vec<Uuid>, settings: GameSettings) -> Game {
        Game {
            id: Uuid::new_v4(),
            name: "The Drowned Coast".to_owned(),
            status: GameStatus::Setup,
            members,
            settings,
            created_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_contest_window_defaults_to_half_silence_timer() {
        let g = game(vec![], GameSettings::default());
        assert_eq!(g.contest_window_hours(), 6);
    }

    #[test]
    fn test_contest_window_has_one_hour_floor() {
        let settings = GameSettings {
            silence_timer_hours: 1,
            ..GameSettings::default()
        };
        assert_eq!(game(vec![], settings).contest_window_hours(), 1);
    }

    #[test]
    fn test_contest_window_override_wins() {
        let settings = GameSettings {
            fortune_roll_contest_window_hours: Some(24),
            ..GameSettings::default()
        };
        assert_eq!(game(vec![], settings).contest_window_hours(), 24);
    }

    #[test]
    fn test_ensure_member_rejects_outsider() {
        let member = Uuid::new_v4();
        let g = game(vec![member], GameSettings::default());
        assert!(g.ensure_member(member).is_ok());
        match g.ensure_member(Uuid::new_v4()).unwrap_err() {
            DomainError::Forbidden(msg) => assert!(msg.contains("not a member")),
            other => panic!("expected Forbidden, got {other:?}"),
        }
    }

    #[test]
    fn test_members_except_preserves_order() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let g = game(vec![a, b, c], GameSettings::default());
        assert_eq!(g.members_except(b), vec![a, c]);
    }
}
