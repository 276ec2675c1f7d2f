//! Session lifecycle: creation from a script, AI-character seating, and
//! player joins.

use uuid::Uuid;

use ravenhall_core::clock::Clock;
use ravenhall_core::error::EngineError;
use ravenhall_core::store::SessionStore;
use ravenhall_content::catalog::{ContentError, ScriptCatalog};

use super::{CONFLICT_RETRIES, decode_session, encode_session};
use crate::domain::session::{Character, LogKind, Player, Session, SessionConfig};

/// Request to seat an AI-driven character at session creation.
#[derive(Debug, Clone)]
pub struct AiCharacterBinding {
    /// The character to seat. Unknown identifiers are skipped with a
    /// warning; creation still succeeds.
    pub character_id: String,
    /// The model every generation for this character will use.
    pub model_name: String,
}

/// Creates a session from a script, seats the requested AI characters, and
/// persists the initial snapshot.
///
/// # Errors
///
/// Returns [`EngineError::Validation`] when the script does not exist or the
/// configuration is unusable, and [`EngineError::Persistence`] when the
/// script cannot be loaded or the initial snapshot cannot be saved.
pub async fn start_session(
    script_id: &str,
    bindings: &[AiCharacterBinding],
    config: SessionConfig,
    clock: &dyn Clock,
    store: &dyn SessionStore,
    scripts: &dyn ScriptCatalog,
) -> Result<Session, EngineError> {
    config.validate()?;

    let script = scripts.get(script_id).await.map_err(|err| match err {
        ContentError::NotFound(id) => EngineError::Validation(format!("script not found: {id}")),
        load @ ContentError::Load { .. } => EngineError::Persistence(load.to_string()),
    })?;

    let now = clock.now();
    let mut session = Session::new(
        format!("game_{}", Uuid::new_v4()),
        script.script_id.clone(),
        format!("session_{}", Uuid::new_v4()),
        config,
        now,
    );
    for def in &script.characters {
        session.add_character(Character {
            character_id: def.id.clone(),
            name: def.name.clone(),
            avatar: def.avatar.clone(),
            description: def.description.clone(),
            model_name: None,
        });
    }

    initialize_ai_characters(&mut session, bindings, clock);

    session.append_log_entry(
        LogKind::GameCreated,
        format!("Game created: {}", script.title),
        None,
        None,
        now,
    );

    store.save(&encode_session(&session, 0)?).await?;
    tracing::info!(
        session_id = session.session_id(),
        script_id,
        characters = session.characters().len(),
        ai_seats = bindings.len(),
        "session created"
    );
    Ok(session)
}

/// Binds models and creates virtual player seats for AI-driven characters.
/// Bindings for unknown characters are skipped with a warning.
fn initialize_ai_characters(
    session: &mut Session,
    bindings: &[AiCharacterBinding],
    clock: &dyn Clock,
) {
    for binding in bindings {
        if !session.bind_model(&binding.character_id, &binding.model_name) {
            tracing::warn!(
                character_id = binding.character_id,
                "skipping AI binding for unknown character"
            );
            continue;
        }

        let seat_id = ai_player_id(&binding.character_id);
        let seated = session
            .add_player(Player::ai(seat_id.clone(), binding.character_id.clone()))
            .is_ok();
        if !seated {
            // The random suffix collided; the model binding still applies.
            tracing::warn!(character_id = binding.character_id, "AI seat id collision");
            continue;
        }

        session.append_log_entry(
            LogKind::AiCharacterInitialized,
            format!(
                "Character {} is played by the house, using model {}",
                binding.character_id, binding.model_name
            ),
            Some(seat_id),
            Some(binding.character_id.clone()),
            clock.now(),
        );
    }
}

fn ai_player_id(character_id: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("ai_{character_id}_{}", &suffix[..8])
}

/// Joins a player to an existing session and logs the arrival.
///
/// # Errors
///
/// Returns [`EngineError::SessionNotFound`] for unknown sessions,
/// [`EngineError::Validation`] for duplicate player identifiers, and
/// [`EngineError::ConcurrencyConflict`] when the versioned write race is
/// lost more than [`CONFLICT_RETRIES`] times.
pub async fn add_player(
    session_id: &str,
    player_id: &str,
    character_id: Option<&str>,
    clock: &dyn Clock,
    store: &dyn SessionStore,
) -> Result<Session, EngineError> {
    let player_id = player_id.trim();
    if player_id.is_empty() {
        return Err(EngineError::Validation("player_id is required".to_owned()));
    }

    let mut conflict = None;
    for _ in 0..=CONFLICT_RETRIES {
        let snapshot = store.load(session_id).await?;
        let mut session = decode_session(&snapshot)?;

        if let Some(character_id) = character_id
            && session.character(character_id).is_none()
        {
            return Err(EngineError::Validation(format!(
                "unknown character: {character_id}"
            )));
        }
        session.add_player(Player::human(
            player_id.to_owned(),
            character_id.map(ToOwned::to_owned),
        ))?;
        session.append_log_entry(
            LogKind::PlayerJoined,
            format!("Player {player_id} joined the game"),
            Some(player_id.to_owned()),
            character_id.map(ToOwned::to_owned),
            clock.now(),
        );

        match store.save(&encode_session(&session, snapshot.version)?).await {
            Ok(()) => {
                tracing::info!(session_id, player_id, "player joined");
                return Ok(session);
            }
            Err(err @ EngineError::ConcurrencyConflict { .. }) => conflict = Some(err),
            Err(other) => return Err(other),
        }
    }

    Err(conflict.unwrap_or_else(|| {
        EngineError::Persistence("conflict retry loop ended without a result".to_owned())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};

    use ravenhall_content::catalog::InMemoryScriptCatalog;
    use ravenhall_content::script::{CharacterDef, Script};
    use ravenhall_test_support::{FixedClock, InMemorySessionStore};

    use crate::domain::session::{GamePhase, PlayerType};

    fn fixed_clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 3, 1, 19, 30, 0).unwrap())
    }

    fn catalog() -> InMemoryScriptCatalog {
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

    #[tokio::test]
    async fn test_start_session_builds_cast_and_persists_initial_snapshot() {
        // Arrange
        let store = InMemorySessionStore::new();

        // Act
        let session = start_session(
            "manor",
            &[],
            SessionConfig::default(),
            &fixed_clock(),
            &store,
            &catalog(),
        )
        .await
        .unwrap();

        // Assert
        assert!(session.session_id().starts_with("session_"));
        assert!(session.game_id().starts_with("game_"));
        assert_eq!(session.script_id(), "manor");
        assert_eq!(session.current_phase(), GamePhase::Initialization);
        assert_eq!(session.characters().len(), 2);
        let log = session.public_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind, LogKind::GameCreated);
        assert_eq!(log[0].text, "Game created: The Ravenhall Affair");
        assert_eq!(store.version_of(session.session_id()), Some(1));
    }

    #[tokio::test]
    async fn test_start_session_seats_ai_characters_with_virtual_players() {
        // Arrange
        let store = InMemorySessionStore::new();
        let bindings = vec![AiCharacterBinding {
            character_id: "butler".to_owned(),
            model_name: "sleuth-70b".to_owned(),
        }];

        // Act
        let session = start_session(
            "manor",
            &bindings,
            SessionConfig::default(),
            &fixed_clock(),
            &store,
            &catalog(),
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(
            session.character("butler").unwrap().model_name.as_deref(),
            Some("sleuth-70b")
        );
        let (seat_id, seat) = session
            .players()
            .iter()
            .next()
            .expect("one virtual seat expected");
        assert!(seat_id.starts_with("ai_butler_"));
        assert_eq!(seat_id.len(), "ai_butler_".len() + 8);
        assert_eq!(seat.player_type, PlayerType::Ai);
        assert_eq!(seat.character_id.as_deref(), Some("butler"));
        assert!(
            session
                .public_log()
                .iter()
                .any(|e| e.kind == LogKind::AiCharacterInitialized)
        );
    }

    #[tokio::test]
    async fn test_start_session_skips_bindings_for_unknown_characters() {
        let store = InMemorySessionStore::new();
        let bindings = vec![AiCharacterBinding {
            character_id: "gardener".to_owned(),
            model_name: "sleuth-70b".to_owned(),
        }];

        let session = start_session(
            "manor",
            &bindings,
            SessionConfig::default(),
            &fixed_clock(),
            &store,
            &catalog(),
        )
        .await
        .unwrap();

        // Creation succeeded with no seat and no binding.
        assert!(session.players().is_empty());
        assert!(
            session
                .public_log()
                .iter()
                .all(|e| e.kind != LogKind::AiCharacterInitialized)
        );
    }

    #[tokio::test]
    async fn test_start_session_rejects_zero_act_config() {
        // Arrange
        let store = InMemorySessionStore::new();
        let config = SessionConfig {
            max_acts: 0,
            ..SessionConfig::default()
        };

        // Act
        let err = start_session("manor", &[], config, &fixed_clock(), &store, &catalog())
            .await
            .unwrap_err();

        // Assert: rejected up front, nothing persisted. A zero-act session
        // would start with current_act above its own maximum.
        assert!(matches!(err, EngineError::Validation(msg) if msg.contains("max_acts")));
    }

    #[tokio::test]
    async fn test_start_session_with_unknown_script_is_a_validation_error() {
        let store = InMemorySessionStore::new();

        let err = start_session(
            "attic",
            &[],
            SessionConfig::default(),
            &fixed_clock(),
            &store,
            &catalog(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EngineError::Validation(msg) if msg.contains("attic")));
    }

    #[tokio::test]
    async fn test_add_player_appends_to_turn_order_and_logs() {
        // Arrange
        let store = InMemorySessionStore::new();
        let session = start_session(
            "manor",
            &[],
            SessionConfig::default(),
            &fixed_clock(),
            &store,
            &catalog(),
        )
        .await
        .unwrap();
        let session_id = session.session_id().to_owned();

        // Act
        let updated = add_player(&session_id, "alice", Some("inspector"), &fixed_clock(), &store)
            .await
            .unwrap();

        // Assert
        assert_eq!(updated.turn_order(), ["alice"]);
        assert_eq!(
            updated.players()["alice"].character_id.as_deref(),
            Some("inspector")
        );
        assert_eq!(
            updated.public_log().last().unwrap().kind,
            LogKind::PlayerJoined
        );
        assert_eq!(store.version_of(&session_id), Some(2));
    }

    #[tokio::test]
    async fn test_add_player_rejects_duplicates_and_unknown_characters() {
        let store = InMemorySessionStore::new();
        let session = start_session(
            "manor",
            &[],
            SessionConfig::default(),
            &fixed_clock(),
            &store,
            &catalog(),
        )
        .await
        .unwrap();
        let session_id = session.session_id().to_owned();
        add_player(&session_id, "alice", None, &fixed_clock(), &store)
            .await
            .unwrap();

        let dup = add_player(&session_id, "alice", None, &fixed_clock(), &store)
            .await
            .unwrap_err();
        assert!(matches!(dup, EngineError::Validation(msg) if msg.contains("alice")));

        let unknown = add_player(&session_id, "bob", Some("gardener"), &fixed_clock(), &store)
            .await
            .unwrap_err();
        assert!(matches!(unknown, EngineError::Validation(msg) if msg.contains("gardener")));
    }

    #[tokio::test]
    async fn test_add_player_to_unknown_session_is_not_found() {
        let store = InMemorySessionStore::new();

        let err = add_player("session_missing", "alice", None, &fixed_clock(), &store)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::SessionNotFound(_)));
    }
}
