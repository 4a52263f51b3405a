//! `PostgreSQL` implementation of the `NarrativeStore` trait.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};
use uuid::Uuid;

use loom_core::arena::GameArena;
use loom_core::changeset::{Changeset, Guard, Write};
use loom_core::error::{ConflictKind, DomainError};
use loom_core::model::{
    Act, Beat, BeatComment, FortuneRoll, Game, OracleComment, OracleEvent, OracleVote, Proposal,
    ProposalStatus, Scene, Vote,
};
use loom_core::repository::NarrativeStore;

use crate::schema::{
    UQ_ORACLE_VOTES_ORACLE_VOTER, UQ_PROPOSALS_OPEN_TARGET, UQ_VOTES_PROPOSAL_VOTER,
};

/// PostgreSQL-backed narrative store.
#[derive(Debug, Clone)]
pub struct PgNarrativeStore {
    pool: PgPool,
}

impl PgNarrativeStore {
    /// Creates a new `PgNarrativeStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translates constraint violations into conflicts; everything else is an
/// infrastructure failure.
fn map_sqlx_error(err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.constraint() {
            Some(UQ_VOTES_PROPOSAL_VOTER | UQ_ORACLE_VOTES_ORACLE_VOTER) => {
                return DomainError::Conflict(ConflictKind::AlreadyVoted);
            }
            Some(UQ_PROPOSALS_OPEN_TARGET) => {
                return DomainError::Conflict(ConflictKind::DuplicateOpenProposal);
            }
            _ => {}
        }
    }
    DomainError::Infrastructure(err.to_string())
}

fn proposal_status(status: ProposalStatus) -> &'static str {
    match status {
        ProposalStatus::Open => "open",
        ProposalStatus::Approved => "approved",
    }
}

async fn load_bodies<T>(
    conn: &mut PgConnection,
    table: &str,
    game_id: Uuid,
) -> Result<Vec<T>, DomainError>
where
    T: DeserializeOwned + Send + Unpin + 'static,
{
    let sql = format!("SELECT body FROM {table} WHERE game_id = $1 ORDER BY seq");
    let rows: Vec<Json<T>> = sqlx::query_scalar(&sql)
        .bind(game_id)
        .fetch_all(conn)
        .await
        .map_err(map_sqlx_error)?;
    Ok(rows.into_iter().map(|Json(body)| body).collect())
}

async fn check_guard(
    conn: &mut PgConnection,
    game_id: Uuid,
    guard: &Guard,
) -> Result<(), DomainError> {
    let (entity, id, holds) = match guard {
        Guard::ProposalOpen(id) => {
            let holds: Option<bool> = sqlx::query_scalar(
                "SELECT status = 'open' FROM proposals WHERE id = $1 AND game_id = $2 FOR UPDATE",
            )
            .bind(id)
            .bind(game_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;
            ("proposal", *id, holds)
        }
        Guard::FortuneRollPending(id) => {
            let holds: Option<bool> = sqlx::query_scalar(
                "SELECT pending FROM fortune_rolls WHERE id = $1 AND game_id = $2 FOR UPDATE",
            )
            .bind(id)
            .bind(game_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;
            ("fortune roll", *id, holds)
        }
        Guard::OracleUnselected(id) => {
            let holds: Option<bool> = sqlx::query_scalar(
                "SELECT NOT finalized FROM oracles WHERE id = $1 AND game_id = $2 FOR UPDATE",
            )
            .bind(id)
            .bind(game_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;
            ("oracle", *id, holds)
        }
        Guard::BeatStatus { beat_id, expected } => {
            let holds: Option<bool> = sqlx::query_scalar(
                "SELECT status = $3 FROM beats WHERE id = $1 AND game_id = $2 FOR UPDATE",
            )
            .bind(beat_id)
            .bind(game_id)
            .bind(expected.as_str())
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;
            ("beat", *beat_id, holds)
        }
    };

    match holds {
        None => Err(DomainError::not_found(entity, id)),
        Some(true) => Ok(()),
        Some(false) => Err(DomainError::Conflict(ConflictKind::AlreadyResolved)),
    }
}

#[allow(clippy::too_many_lines)]
async fn apply_write(
    conn: &mut PgConnection,
    game_id: Uuid,
    write: &Write,
) -> Result<(), sqlx::Error> {
    match write {
        Write::Game(game) => {
            sqlx::query("UPDATE games SET body = $2 WHERE id = $1")
                .bind(game.id)
                .bind(Json(game))
                .execute(conn)
                .await?;
        }
        Write::Act(act) => {
            sqlx::query(
                "INSERT INTO acts (id, game_id, body) VALUES ($1, $2, $3)
                 ON CONFLICT (id) DO UPDATE SET body = EXCLUDED.body",
            )
            .bind(act.id)
            .bind(game_id)
            .bind(Json(act))
            .execute(conn)
            .await?;
        }
        Write::Scene(scene) => {
            sqlx::query(
                "INSERT INTO scenes (id, game_id, act_id, body) VALUES ($1, $2, $3, $4)
                 ON CONFLICT (id) DO UPDATE SET body = EXCLUDED.body",
            )
            .bind(scene.id)
            .bind(game_id)
            .bind(scene.act_id)
            .bind(Json(scene))
            .execute(conn)
            .await?;
        }
        Write::Beat(beat) => {
            sqlx::query(
                "INSERT INTO beats (id, game_id, scene_id, status, body) VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (id) DO UPDATE SET status = EXCLUDED.status, body = EXCLUDED.body",
            )
            .bind(beat.id)
            .bind(game_id)
            .bind(beat.scene_id)
            .bind(beat.status.as_str())
            .bind(Json(beat))
            .execute(conn)
            .await?;
        }
        Write::BeatComment(comment) => {
            sqlx::query(
                "INSERT INTO beat_comments (id, game_id, beat_id, body) VALUES ($1, $2, $3, $4)
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(comment.id)
            .bind(game_id)
            .bind(comment.beat_id)
            .bind(Json(comment))
            .execute(conn)
            .await?;
        }
        Write::Proposal(proposal) => {
            sqlx::query(
                "INSERT INTO proposals (id, game_id, proposal_type, target_key, status, body)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (id) DO UPDATE SET status = EXCLUDED.status, body = EXCLUDED.body",
            )
            .bind(proposal.id)
            .bind(game_id)
            .bind(proposal.proposal_type().as_str())
            .bind(proposal.subject.dedup_target())
            .bind(proposal_status(proposal.status))
            .bind(Json(proposal))
            .execute(conn)
            .await?;
        }
        Write::Vote(vote) => {
            sqlx::query(
                "INSERT INTO votes (id, game_id, proposal_id, voter_id, body)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(vote.id)
            .bind(game_id)
            .bind(vote.proposal_id)
            .bind(vote.voter_id)
            .bind(Json(vote))
            .execute(conn)
            .await?;
        }
        Write::FortuneRoll(roll) => {
            sqlx::query(
                "INSERT INTO fortune_rolls (id, game_id, beat_id, pending, body)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (id) DO UPDATE SET pending = EXCLUDED.pending, body = EXCLUDED.body",
            )
            .bind(roll.id)
            .bind(game_id)
            .bind(roll.beat_id)
            .bind(roll.is_pending())
            .bind(Json(roll))
            .execute(conn)
            .await?;
        }
        Write::Oracle(oracle) => {
            sqlx::query(
                "INSERT INTO oracles (id, game_id, beat_id, finalized, body)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (id) DO UPDATE SET finalized = EXCLUDED.finalized, body = EXCLUDED.body",
            )
            .bind(oracle.id)
            .bind(game_id)
            .bind(oracle.beat_id)
            .bind(oracle.is_finalized())
            .bind(Json(oracle))
            .execute(conn)
            .await?;
        }
        Write::OracleVote(vote) => {
            sqlx::query(
                "INSERT INTO oracle_votes (id, game_id, oracle_id, voter_id, body)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(vote.id)
            .bind(game_id)
            .bind(vote.oracle_id)
            .bind(vote.voter_id)
            .bind(Json(vote))
            .execute(conn)
            .await?;
        }
        Write::OracleComment(comment) => {
            sqlx::query(
                "INSERT INTO oracle_comments (id, game_id, oracle_id, body) VALUES ($1, $2, $3, $4)
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(comment.id)
            .bind(game_id)
            .bind(comment.oracle_id)
            .bind(Json(comment))
            .execute(conn)
            .await?;
        }
    }
    Ok(())
}

#[async_trait]
impl NarrativeStore for PgNarrativeStore {
    async fn create_game(&self, game: &Game) -> Result<(), DomainError> {
        sqlx::query("INSERT INTO games (id, body, created_at) VALUES ($1, $2, $3)")
            .bind(game.id)
            .bind(Json(game))
            .bind(game.created_at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_arena(&self, game_id: Uuid) -> Result<GameArena, DomainError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let game: Option<Json<Game>> = sqlx::query_scalar("SELECT body FROM games WHERE id = $1")
            .bind(game_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        let Some(Json(game)) = game else {
            return Err(DomainError::not_found("game", game_id));
        };

        let mut writes = Vec::new();
        writes.extend(
            load_bodies::<Act>(&mut tx, "acts", game_id)
                .await?
                .into_iter()
                .map(Write::Act),
        );
        writes.extend(
            load_bodies::<Scene>(&mut tx, "scenes", game_id)
                .await?
                .into_iter()
                .map(Write::Scene),
        );
        writes.extend(
            load_bodies::<Beat>(&mut tx, "beats", game_id)
                .await?
                .into_iter()
                .map(Write::Beat),
        );
        writes.extend(
            load_bodies::<BeatComment>(&mut tx, "beat_comments", game_id)
                .await?
                .into_iter()
                .map(Write::BeatComment),
        );
        writes.extend(
            load_bodies::<Proposal>(&mut tx, "proposals", game_id)
                .await?
                .into_iter()
                .map(Write::Proposal),
        );
        writes.extend(
            load_bodies::<Vote>(&mut tx, "votes", game_id)
                .await?
                .into_iter()
                .map(Write::Vote),
        );
        writes.extend(
            load_bodies::<FortuneRoll>(&mut tx, "fortune_rolls", game_id)
                .await?
                .into_iter()
                .map(Write::FortuneRoll),
        );
        writes.extend(
            load_bodies::<OracleEvent>(&mut tx, "oracles", game_id)
                .await?
                .into_iter()
                .map(Write::Oracle),
        );
        writes.extend(
            load_bodies::<OracleVote>(&mut tx, "oracle_votes", game_id)
                .await?
                .into_iter()
                .map(Write::OracleVote),
        );
        writes.extend(
            load_bodies::<OracleComment>(&mut tx, "oracle_comments", game_id)
                .await?
                .into_iter()
                .map(Write::OracleComment),
        );
        tx.commit().await.map_err(map_sqlx_error)?;

        let mut arena = GameArena::new(game);
        for write in writes {
            arena.put(write)?;
        }
        Ok(arena)
    }

    #[instrument(skip(self, changeset), fields(game_id = %changeset.game_id))]
    async fn commit(&self, changeset: &Changeset) -> Result<(), DomainError> {
        let game_id = changeset.game_id;
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Serialises commits per game.
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM games WHERE id = $1 FOR UPDATE")
                .bind(game_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        if locked.is_none() {
            return Err(DomainError::not_found("game", game_id));
        }

        for guard in &changeset.guards {
            check_guard(&mut tx, game_id, guard).await?;
        }
        for write in &changeset.writes {
            apply_write(&mut tx, game_id, write)
                .await
                .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(
            guards = changeset.guards.len(),
            writes = changeset.writes.len(),
            "changeset committed"
        );
        Ok(())
    }

    async fn delete_game(&self, game_id: Uuid) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM games WHERE id = $1")
            .bind(game_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("game", game_id));
        }
        Ok(())
    }
}
