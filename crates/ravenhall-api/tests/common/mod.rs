//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use ravenhall_content::catalog::InMemoryScriptCatalog;
use ravenhall_content::script::{CharacterDef, Script};
use ravenhall_core::clock::Clock;
use ravenhall_session_store::pg_session_store::PgSessionStore;
use ravenhall_test_support::{FixedClock, StubDialogueProvider};

use ravenhall_api::routes;
use ravenhall_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 3, 1, 20, 0, 0).unwrap(),
    ))
}

/// The script every integration test plays.
fn test_catalog() -> InMemoryScriptCatalog {
    InMemoryScriptCatalog::new([Script {
        script_id: "manor".to_owned(),
        title: "The Ravenhall Affair".to_owned(),
        characters: vec![
            CharacterDef {
                id: "inspector".to_owned(),
                name: "Inspector Gray".to_owned(),
                avatar: String::new(),
                description: "Called in from the city.".to_owned(),
            },
            CharacterDef {
                id: "butler".to_owned(),
                name: "The Butler".to_owned(),
                avatar: String::new(),
                description: "Has served the house for decades.".to_owned(),
            },
        ],
    }])
}

/// Build the full app router with a real `PgSessionStore` and deterministic
/// clock and dialogue. Uses the same route structure as `main.rs`.
pub fn build_test_app(pool: PgPool) -> Router {
    let app_state = AppState::new(
        Arc::new(PgSessionStore::new(pool)),
        Arc::new(StubDialogueProvider::new(
            "I arrived at dusk.\n\nThe gate was already open.",
            "I was in the library.",
        )),
        fixed_clock(),
        Arc::new(test_catalog()),
    );

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/sessions", routes::session::router())
        .with_state(app_state)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
