//! `PostgreSQL` implementation of the `SessionStore` trait.
//!
//! One row per session, holding the whole serialized state and a version
//! counter. The versioned `UPDATE` is the concurrency control: a writer
//! whose expected version no longer matches updates zero rows and the save
//! is reported as a conflict.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use ravenhall_core::error::EngineError;
use ravenhall_core::store::{SessionSnapshot, SessionStore};

/// PostgreSQL-backed session store.
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Creates a new `PgSessionStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn stored_version(&self, session_id: &str) -> Result<Option<i64>, EngineError> {
        let row = sqlx::query("SELECT version FROM game_sessions WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;
        row.map(|r| r.try_get("version").map_err(persistence))
            .transpose()
    }
}

fn persistence(err: sqlx::Error) -> EngineError {
    EngineError::Persistence(err.to_string())
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, session_id: &str) -> Result<SessionSnapshot, EngineError> {
        let row = sqlx::query("SELECT state, version FROM game_sessions WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_owned()))?;

        Ok(SessionSnapshot {
            session_id: session_id.to_owned(),
            state: row.try_get("state").map_err(persistence)?,
            version: row.try_get("version").map_err(persistence)?,
        })
    }

    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), EngineError> {
        if snapshot.version == 0 {
            // Creation path. ON CONFLICT DO NOTHING keeps a racing duplicate
            // creation from overwriting the winner.
            let result = sqlx::query(
                "INSERT INTO game_sessions (session_id, state, version, updated_at) \
                 VALUES ($1, $2, 1, NOW()) \
                 ON CONFLICT (session_id) DO NOTHING",
            )
            .bind(&snapshot.session_id)
            .bind(&snapshot.state)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;

            if result.rows_affected() == 0 {
                let actual = self
                    .stored_version(&snapshot.session_id)
                    .await?
                    .unwrap_or(0);
                return Err(EngineError::ConcurrencyConflict {
                    session_id: snapshot.session_id.clone(),
                    expected: 0,
                    actual,
                });
            }
            tracing::debug!(session_id = snapshot.session_id, "session row created");
            return Ok(());
        }

        let result = sqlx::query(
            "UPDATE game_sessions \
             SET state = $2, version = $3, updated_at = NOW() \
             WHERE session_id = $1 AND version = $4",
        )
        .bind(&snapshot.session_id)
        .bind(&snapshot.state)
        .bind(snapshot.version + 1)
        .bind(snapshot.version)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        if result.rows_affected() == 0 {
            return match self.stored_version(&snapshot.session_id).await? {
                Some(actual) => Err(EngineError::ConcurrencyConflict {
                    session_id: snapshot.session_id.clone(),
                    expected: snapshot.version,
                    actual,
                }),
                None => Err(EngineError::SessionNotFound(snapshot.session_id.clone())),
            };
        }
        tracing::debug!(
            session_id = snapshot.session_id,
            version = snapshot.version + 1,
            "session row updated"
        );
        Ok(())
    }
}
