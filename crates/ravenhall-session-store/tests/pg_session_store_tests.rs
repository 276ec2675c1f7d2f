//! Integration tests for `PgSessionStore`.

use ravenhall_core::error::EngineError;
use ravenhall_core::store::{SessionSnapshot, SessionStore};
use ravenhall_session_store::pg_session_store::PgSessionStore;
use sqlx::PgPool;

fn make_snapshot(session_id: &str, version: i64) -> SessionSnapshot {
    SessionSnapshot {
        session_id: session_id.to_owned(),
        state: serde_json::json!({"current_act": 1, "current_phase": "initialization"}),
        version,
    }
}

// --- load ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_load_unknown_session_is_not_found(pool: PgPool) {
    let store = PgSessionStore::new(pool);

    let result = store.load("session_missing").await;

    assert!(matches!(result, Err(EngineError::SessionNotFound(id)) if id == "session_missing"));
}

// --- save + load round-trip ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_then_load_returns_state_at_version_one(pool: PgPool) {
    let store = PgSessionStore::new(pool);
    let snapshot = make_snapshot("session_1", 0);

    store.save(&snapshot).await.unwrap();

    let loaded = store.load("session_1").await.unwrap();
    assert_eq!(loaded.state, snapshot.state);
    assert_eq!(loaded.version, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_with_matching_version_increments(pool: PgPool) {
    let store = PgSessionStore::new(pool);
    store.save(&make_snapshot("session_1", 0)).await.unwrap();

    let mut updated = store.load("session_1").await.unwrap();
    updated.state = serde_json::json!({"current_act": 2, "current_phase": "monologue"});
    store.save(&updated).await.unwrap();

    let loaded = store.load("session_1").await.unwrap();
    assert_eq!(loaded.version, 2);
    assert_eq!(loaded.state["current_act"], 2);
}

// --- concurrency ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_duplicate_creation_is_a_conflict(pool: PgPool) {
    let store = PgSessionStore::new(pool);
    store.save(&make_snapshot("session_1", 0)).await.unwrap();

    let result = store.save(&make_snapshot("session_1", 0)).await;

    match result {
        Err(EngineError::ConcurrencyConflict {
            session_id,
            expected,
            actual,
        }) => {
            assert_eq!(session_id, "session_1");
            assert_eq!(expected, 0);
            assert_eq!(actual, 1);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_stale_version_update_is_a_conflict(pool: PgPool) {
    let store = PgSessionStore::new(pool);
    store.save(&make_snapshot("session_1", 0)).await.unwrap();
    let loaded = store.load("session_1").await.unwrap();

    // A second writer saves first.
    store.save(&loaded).await.unwrap();

    let result = store.save(&loaded).await;

    match result {
        Err(EngineError::ConcurrencyConflict {
            expected, actual, ..
        }) => {
            assert_eq!(expected, 1);
            assert_eq!(actual, 2);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_of_missing_session_is_not_found(pool: PgPool) {
    let store = PgSessionStore::new(pool);

    let result = store.save(&make_snapshot("session_missing", 3)).await;

    assert!(matches!(result, Err(EngineError::SessionNotFound(_))));
}

// --- session isolation ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_sessions_are_isolated(pool: PgPool) {
    let store = PgSessionStore::new(pool);
    store.save(&make_snapshot("session_a", 0)).await.unwrap();
    store.save(&make_snapshot("session_b", 0)).await.unwrap();

    let mut a = store.load("session_a").await.unwrap();
    a.state = serde_json::json!({"current_act": 3});
    store.save(&a).await.unwrap();

    let b = store.load("session_b").await.unwrap();
    assert_eq!(b.version, 1);
    assert_eq!(b.state["current_act"], 1);
}
