//! Database schema for the Loom store.
//!
//! Every entity row carries its full serialized form in `body`; the other
//! columns exist for foreign keys, uniqueness and commit guards. Rows are
//! loaded back in `seq` order, which preserves insertion order for votes
//! and comments.

use sqlx::PgPool;

/// One vote per (proposal, voter).
pub const UQ_VOTES_PROPOSAL_VOTER: &str = "uq_votes_proposal_voter";

/// One interpretation vote per (oracle, voter).
pub const UQ_ORACLE_VOTES_ORACLE_VOTER: &str = "uq_oracle_votes_oracle_voter";

/// One open proposal per (game, type, target).
pub const UQ_PROPOSALS_OPEN_TARGET: &str = "uq_proposals_open_target";

/// SQL to create every table and index.
pub const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS games (
    id         UUID PRIMARY KEY,
    body       JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS acts (
    id      UUID PRIMARY KEY,
    game_id UUID NOT NULL REFERENCES games (id) ON DELETE CASCADE,
    seq     BIGSERIAL NOT NULL,
    body    JSONB NOT NULL
);

CREATE TABLE IF NOT EXISTS scenes (
    id      UUID PRIMARY KEY,
    game_id UUID NOT NULL REFERENCES games (id) ON DELETE CASCADE,
    act_id  UUID NOT NULL REFERENCES acts (id) ON DELETE CASCADE,
    seq     BIGSERIAL NOT NULL,
    body    JSONB NOT NULL
);

CREATE TABLE IF NOT EXISTS beats (
    id       UUID PRIMARY KEY,
    game_id  UUID NOT NULL REFERENCES games (id) ON DELETE CASCADE,
    scene_id UUID NOT NULL REFERENCES scenes (id) ON DELETE CASCADE,
    status   VARCHAR(32) NOT NULL,
    seq      BIGSERIAL NOT NULL,
    body     JSONB NOT NULL
);

CREATE TABLE IF NOT EXISTS beat_comments (
    id      UUID PRIMARY KEY,
    game_id UUID NOT NULL REFERENCES games (id) ON DELETE CASCADE,
    beat_id UUID NOT NULL REFERENCES beats (id) ON DELETE CASCADE,
    seq     BIGSERIAL NOT NULL,
    body    JSONB NOT NULL
);

CREATE TABLE IF NOT EXISTS proposals (
    id            UUID PRIMARY KEY,
    game_id       UUID NOT NULL REFERENCES games (id) ON DELETE CASCADE,
    proposal_type VARCHAR(32) NOT NULL,
    target_key    UUID,
    status        VARCHAR(16) NOT NULL,
    seq           BIGSERIAL NOT NULL,
    body          JSONB NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS uq_proposals_open_target
    ON proposals (game_id, proposal_type, COALESCE(target_key, '00000000-0000-0000-0000-000000000000'::uuid))
    WHERE status = 'open';

CREATE TABLE IF NOT EXISTS votes (
    id          UUID PRIMARY KEY,
    game_id     UUID NOT NULL REFERENCES games (id) ON DELETE CASCADE,
    proposal_id UUID NOT NULL REFERENCES proposals (id) ON DELETE CASCADE,
    voter_id    UUID NOT NULL,
    seq         BIGSERIAL NOT NULL,
    body        JSONB NOT NULL,
    CONSTRAINT uq_votes_proposal_voter UNIQUE (proposal_id, voter_id)
);

CREATE TABLE IF NOT EXISTS fortune_rolls (
    id      UUID PRIMARY KEY,
    game_id UUID NOT NULL REFERENCES games (id) ON DELETE CASCADE,
    beat_id UUID NOT NULL REFERENCES beats (id) ON DELETE CASCADE,
    pending BOOLEAN NOT NULL,
    seq     BIGSERIAL NOT NULL,
    body    JSONB NOT NULL
);

CREATE TABLE IF NOT EXISTS oracles (
    id        UUID PRIMARY KEY,
    game_id   UUID NOT NULL REFERENCES games (id) ON DELETE CASCADE,
    beat_id   UUID NOT NULL REFERENCES beats (id) ON DELETE CASCADE,
    finalized BOOLEAN NOT NULL,
    seq       BIGSERIAL NOT NULL,
    body      JSONB NOT NULL
);

CREATE TABLE IF NOT EXISTS oracle_votes (
    id        UUID PRIMARY KEY,
    game_id   UUID NOT NULL REFERENCES games (id) ON DELETE CASCADE,
    oracle_id UUID NOT NULL REFERENCES oracles (id) ON DELETE CASCADE,
    voter_id  UUID NOT NULL,
    seq       BIGSERIAL NOT NULL,
    body      JSONB NOT NULL,
    CONSTRAINT uq_oracle_votes_oracle_voter UNIQUE (oracle_id, voter_id)
);

CREATE TABLE IF NOT EXISTS oracle_comments (
    id        UUID PRIMARY KEY,
    game_id   UUID NOT NULL REFERENCES games (id) ON DELETE CASCADE,
    oracle_id UUID NOT NULL REFERENCES oracles (id) ON DELETE CASCADE,
    seq       BIGSERIAL NOT NULL,
    body      JSONB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_proposals_game_id ON proposals (game_id, seq);
CREATE INDEX IF NOT EXISTS idx_votes_game_id ON votes (game_id, seq);
CREATE INDEX IF NOT EXISTS idx_beats_game_id ON beats (game_id, seq);
";

/// Creates the schema if it does not exist yet.
///
/// # Errors
///
/// Returns the database error if any statement fails.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(CREATE_TABLES).execute(pool).await?;
    Ok(())
}
