//! PostgreSQL persistence for session snapshots.

pub mod pg_session_store;
pub mod schema;
