//! Outbound notifications.

use serde::Serialize;
use uuid::Uuid;

use crate::model::Game;

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A beat was submitted.
    NewBeat,
    /// A proposal needs the recipient's vote.
    VoteRequired,
    /// Oracle interpretations are ready.
    OracleReady,
    /// The recipient's beat was challenged.
    BeatChallenged,
    /// The recipient's beat became canon.
    BeatApproved,
    /// The recipient's fortune roll was contested.
    FortuneRollContested,
    /// A new act was proposed.
    ActProposed,
    /// A new scene was proposed.
    SceneProposed,
    /// The recipient's challenge was dismissed.
    ChallengeDismissed,
    /// A challenged beat was revised.
    BeatRevised,
    /// Someone commented on a challenged beat.
    BeatCommentAdded,
}

/// A message for one or more members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Users to notify.
    pub recipients: Vec<Uuid>,
    /// The game concerned.
    pub game_id: Uuid,
    /// Kind of event.
    pub kind: NotificationKind,
    /// Human-readable message.
    pub message: String,
    /// Where the recipient should look.
    pub link: Option<String>,
}

impl Notification {
    /// A notification for every member of `game` except `exclude`.
    pub fn to_members(
        game: &Game,
        exclude: Option<Uuid>,
        kind: NotificationKind,
        message: impl Into<String>,
    ) -> Self {
        let recipients = match exclude {
            Some(user_id) => game.members_except(user_id),
            None => game.members.clone(),
        };
        Self {
            recipients,
            game_id: game.id,
            kind,
            message: message.into(),
            link: None,
        }
    }

    /// A notification for a single user.
    pub fn to_user(
        game_id: Uuid,
        user_id: Uuid,
        kind: NotificationKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recipients: vec![user_id],
            game_id,
            kind,
            message: message.into(),
            link: None,
        }
    }

    /// Attaches a link.
    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// Fire-and-forget delivery. Implementations enqueue and return; delivery
/// failures are theirs to log. Called only after a commit succeeded.
pub trait Notifier: Send + Sync {
    /// Enqueues a notification. Notifications without recipients may be
    /// dropped.
    fn notify(&self, notification: Notification);
}

/// The first 60 characters of `text`, for message labels.
#[must_use]
pub fn excerpt(text: &str) -> String {
    text.chars().take(60).collect()
}

/// Link to a scene page.
#[must_use]
pub fn scene_link(game_id: Uuid, scene_id: Uuid) -> String {
    format!("/games/{game_id}/scenes/{scene_id}")
}

/// Link to a game page.
#[must_use]
pub fn game_link(game_id: Uuid) -> String {
    format!("/games/{game_id}")
}
