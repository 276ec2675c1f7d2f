//! Session store database schema.

/// SQL to create the sessions table.
pub const CREATE_GAME_SESSIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS game_sessions (
    session_id VARCHAR(255) PRIMARY KEY,
    state      JSONB NOT NULL,
    version    BIGINT NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";
