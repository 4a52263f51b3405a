//! The challenge cycle of a canon beat.
//!
//! canon → challenged (any member) → proposed again with revised prose
//! (author accepts) or canon (author dismisses). The reason, challenger and
//! outcome stay on the beat after resolution.

use chrono::{DateTime, Utc};
use loom_core::changeset::{Guard, UnitOfWork, Write};
use loom_core::error::DomainError;
use loom_core::model::{Beat, BeatComment, BeatEvent, BeatStatus, ChallengeOutcome};
use uuid::Uuid;

/// Trims `text`, rejecting it if nothing is left.
pub(crate) fn non_empty(text: &str, what: &str) -> Result<String, DomainError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(DomainError::validation(format!("{what} is required")))
    } else {
        Ok(trimmed.to_owned())
    }
}

fn challenged_beat(uow: &mut UnitOfWork, beat_id: Uuid) -> Result<Beat, DomainError> {
    let beat = uow.arena().beat(beat_id)?.clone();
    if beat.status != BeatStatus::Challenged {
        return Err(DomainError::invalid_state("beat is not challenged"));
    }
    uow.guard(Guard::BeatStatus {
        beat_id,
        expected: BeatStatus::Challenged,
    })?;
    Ok(beat)
}

fn ensure_author(beat: &Beat, actor_id: Uuid) -> Result<(), DomainError> {
    if beat.author_id == actor_id {
        Ok(())
    } else {
        Err(DomainError::forbidden(
            "only the author can resolve a challenge",
        ))
    }
}

/// Disputes a canon beat.
///
/// # Errors
///
/// `Validation` for a blank reason, `InvalidState` unless the beat is
/// canon.
pub fn challenge(
    uow: &mut UnitOfWork,
    beat_id: Uuid,
    challenger_id: Uuid,
    reason: &str,
) -> Result<Beat, DomainError> {
    let reason = non_empty(reason, "challenge reason")?;
    let mut beat = uow.arena().beat(beat_id)?.clone();
    if beat.status != BeatStatus::Canon {
        return Err(DomainError::invalid_state(
            "only canon beats can be challenged",
        ));
    }
    uow.guard(Guard::BeatStatus {
        beat_id,
        expected: BeatStatus::Canon,
    })?;

    beat.status = BeatStatus::Challenged;
    beat.challenge_reason = Some(reason);
    beat.challenged_by_id = Some(challenger_id);
    beat.challenge_outcome = None;
    uow.stage(Write::Beat(beat.clone()))?;
    Ok(beat)
}

/// Replaces the beat's prose with `revised` and sends it back to the vote.
/// Non-prose events (notes, rolls, oracles) are kept in place.
///
/// # Errors
///
/// `InvalidState` unless challenged, `Forbidden` for anyone but the author,
/// `Validation` for blank prose.
pub fn accept_revision(
    uow: &mut UnitOfWork,
    beat_id: Uuid,
    actor_id: Uuid,
    revised: &str,
) -> Result<Beat, DomainError> {
    let mut beat = challenged_beat(uow, beat_id)?;
    ensure_author(&beat, actor_id)?;
    let revised = non_empty(revised, "revised content")?;

    let first_prose = beat
        .events
        .iter()
        .position(|event| matches!(event, BeatEvent::Narrative { .. }))
        .unwrap_or(0);
    beat.events
        .retain(|event| !matches!(event, BeatEvent::Narrative { .. }));
    beat.events
        .insert(first_prose.min(beat.events.len()), BeatEvent::Narrative { content: revised });
    beat.status = BeatStatus::Proposed;
    beat.challenge_outcome = Some(ChallengeOutcome::AcceptedRevision);
    uow.stage(Write::Beat(beat.clone()))?;
    Ok(beat)
}

/// Keeps the beat as it was.
///
/// # Errors
///
/// `InvalidState` unless challenged, `Forbidden` for anyone but the author.
pub fn dismiss(uow: &mut UnitOfWork, beat_id: Uuid, actor_id: Uuid) -> Result<Beat, DomainError> {
    let mut beat = challenged_beat(uow, beat_id)?;
    ensure_author(&beat, actor_id)?;

    beat.status = BeatStatus::Canon;
    beat.challenge_outcome = Some(ChallengeOutcome::Dismissed);
    uow.stage(Write::Beat(beat.clone()))?;
    Ok(beat)
}

/// Adds a comment to the discussion of a challenged beat.
///
/// # Errors
///
/// `InvalidState` unless challenged, `Validation` for blank text.
pub fn comment(
    uow: &mut UnitOfWork,
    beat_id: Uuid,
    author_id: Uuid,
    content: &str,
    now: DateTime<Utc>,
) -> Result<BeatComment, DomainError> {
    let beat = uow.arena().beat(beat_id)?;
    if beat.status != BeatStatus::Challenged {
        return Err(DomainError::invalid_state(
            "comments are only allowed on challenged beats",
        ));
    }
    let comment = BeatComment {
        id: Uuid::new_v4(),
        beat_id,
        author_id,
        content: non_empty(content, "comment")?,
        created_at: now,
    };
    uow.guard(Guard::BeatStatus {
        beat_id,
        expected: BeatStatus::Challenged,
    })?;
    uow.stage(Write::BeatComment(comment.clone()))?;
    Ok(comment)
}
