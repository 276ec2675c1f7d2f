//! The session record: durable game state and invariant-preserving mutators.
//!
//! The session is the single aggregate of the engine. It performs no I/O;
//! the dispatcher is its sole mutator and the store merely persists
//! snapshots. The three histories (`public_log`, `qna_history`,
//! `mission_submissions`) are append-only: nothing is removed or rewritten
//! after insertion, which is why they are private fields behind read-only
//! accessors.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ravenhall_core::dialogue::DEFAULT_MODEL;
use ravenhall_core::error::EngineError;

/// The stage a session is currently in within an act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Session created, players joining.
    Initialization,
    /// Characters introduce themselves.
    Monologue,
    /// Open questioning.
    Qna,
    /// Mission/task submissions.
    Mission,
    /// The final decision.
    FinalChoice,
    /// Terminal; no handler transitions out of this phase.
    Completed,
}

impl GamePhase {
    /// The stable external string for this phase.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initialization => "initialization",
            Self::Monologue => "monologue",
            Self::Qna => "qna",
            Self::Mission => "mission",
            Self::FinalChoice => "final_choice",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GamePhase {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initialization" => Ok(Self::Initialization),
            "monologue" => Ok(Self::Monologue),
            "qna" => Ok(Self::Qna),
            "mission" => Ok(Self::Mission),
            "final_choice" => Ok(Self::FinalChoice),
            "completed" => Ok(Self::Completed),
            other => Err(EngineError::Validation(format!("unknown phase: {other}"))),
        }
    }
}

/// Per-session configuration, immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Number of acts in the script.
    pub max_acts: u32,
    /// Shared question pool per character per act.
    pub max_qna_per_character_per_act: u32,
    /// Model used when neither a character binding nor the action names one.
    pub default_model: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_acts: 3,
            max_qna_per_character_per_act: 3,
            default_model: DEFAULT_MODEL.to_owned(),
        }
    }
}

impl SessionConfig {
    /// Checks that a session created with this configuration can satisfy the
    /// act bound `1 <= current_act <= max_acts` and always has a model to
    /// generate with.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when `max_acts` is zero or
    /// `default_model` is blank.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_acts == 0 {
            return Err(EngineError::Validation(
                "max_acts must be at least 1".to_owned(),
            ));
        }
        if self.default_model.trim().is_empty() {
            return Err(EngineError::Validation(
                "default_model must not be blank".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Whether a player seat is driven by a human or by the engine's AI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerType {
    /// A human participant.
    Human,
    /// A virtual seat created by AI-character initialization.
    Ai,
}

/// Spectator/player distinction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerRole {
    /// An active participant.
    Player,
    /// An observer.
    Spectator,
}

/// A participant in a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Unique identifier within the session.
    pub player_id: String,
    /// Bound character, at most one per player.
    pub character_id: Option<String>,
    /// Human or AI seat.
    pub player_type: PlayerType,
    /// Player or spectator.
    pub role: PlayerRole,
    /// Whether the player is still participating.
    pub is_active: bool,
    /// Questions asked by this player in the current act. Reset to zero on
    /// every act advance.
    pub qna_count_current_act: u32,
}

impl Player {
    /// A human player, optionally pre-assigned a character.
    #[must_use]
    pub fn human(player_id: String, character_id: Option<String>) -> Self {
        Self {
            player_id,
            character_id,
            player_type: PlayerType::Human,
            role: PlayerRole::Player,
            is_active: true,
            qna_count_current_act: 0,
        }
    }

    /// A virtual AI seat bound to a character.
    #[must_use]
    pub fn ai(player_id: String, character_id: String) -> Self {
        Self {
            player_id,
            character_id: Some(character_id),
            player_type: PlayerType::Ai,
            role: PlayerRole::Player,
            is_active: true,
            qna_count_current_act: 0,
        }
    }
}

/// A cast member of the session's script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    /// Unique identifier within the session.
    pub character_id: String,
    /// Display name.
    pub name: String,
    /// Avatar image reference.
    pub avatar: String,
    /// Public-facing description.
    pub description: String,
    /// When set, every generation for this character uses this model,
    /// overriding any caller-supplied default.
    pub model_name: Option<String>,
}

/// What a public log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    /// Session creation.
    GameCreated,
    /// A player joined.
    PlayerJoined,
    /// A character monologue.
    Monologue,
    /// A public question and answer.
    Qna,
    /// A mission submission.
    MissionSubmission,
    /// An explicit phase change.
    PhaseChange,
    /// An act advance.
    ActAdvance,
    /// An AI character was bound and seated.
    AiCharacterInitialized,
    /// The final choice was made.
    GameCompleted,
}

/// One entry of the shared narrative record. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Entry identifier.
    pub id: Uuid,
    /// What the entry records.
    pub kind: LogKind,
    /// Free-text narrative.
    pub text: String,
    /// Player this entry is about, if any.
    pub related_player_id: Option<String>,
    /// Character this entry is about, if any.
    pub related_character_id: Option<String>,
    /// When the entry was appended.
    pub at: DateTime<Utc>,
}

/// One accepted question and its answer. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QnaEntry {
    /// Entry identifier.
    pub id: Uuid,
    /// Who asked.
    pub questioner_id: String,
    /// Who was asked.
    pub target_character_id: String,
    /// The question.
    pub question: String,
    /// The recorded answer.
    pub answer: String,
    /// Whether the exchange was mirrored into the public log.
    pub is_public: bool,
    /// The act the question was asked in.
    pub act: u32,
    /// When the entry was recorded.
    pub at: DateTime<Utc>,
}

/// One submitted mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionSubmission {
    /// Submission identifier.
    pub id: Uuid,
    /// Who submitted.
    pub player_id: String,
    /// Mission category.
    pub mission_type: String,
    /// Submission body.
    pub content: String,
    /// When the submission was recorded.
    pub at: DateTime<Utc>,
}

/// Summary returned by [`Session::advance_act`].
#[derive(Debug, Clone, Copy)]
pub struct ActAdvance {
    /// The act the session is now in.
    pub new_act: u32,
    /// How many players had their question counters reset.
    pub players_reset: usize,
}

/// One game instance. Owns all players, characters, and histories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    game_id: String,
    script_id: String,
    session_id: String,
    config: SessionConfig,
    current_phase: GamePhase,
    current_act: u32,
    turn_order: Vec<String>,
    current_turn_index: usize,
    players: BTreeMap<String, Player>,
    characters: BTreeMap<String, Character>,
    public_log: Vec<LogEntry>,
    qna_history: Vec<QnaEntry>,
    mission_submissions: Vec<MissionSubmission>,
    started_at: DateTime<Utc>,
}

impl Session {
    /// Creates a fresh session in act 1, phase `initialization`.
    #[must_use]
    pub fn new(
        game_id: String,
        script_id: String,
        session_id: String,
        config: SessionConfig,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            game_id,
            script_id,
            session_id,
            config,
            current_phase: GamePhase::Initialization,
            current_act: 1,
            turn_order: Vec::new(),
            current_turn_index: 0,
            players: BTreeMap::new(),
            characters: BTreeMap::new(),
            public_log: Vec::new(),
            qna_history: Vec::new(),
            mission_submissions: Vec::new(),
            started_at,
        }
    }

    /// The external lookup key.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The game instance identifier.
    #[must_use]
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// The script this session was created from.
    #[must_use]
    pub fn script_id(&self) -> &str {
        &self.script_id
    }

    /// The immutable session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The current phase.
    #[must_use]
    pub fn current_phase(&self) -> GamePhase {
        self.current_phase
    }

    /// The current act, 1-indexed.
    #[must_use]
    pub fn current_act(&self) -> u32 {
        self.current_act
    }

    /// Join order of players. Append-only, no duplicates.
    #[must_use]
    pub fn turn_order(&self) -> &[String] {
        &self.turn_order
    }

    /// Pointer into [`Self::turn_order`]. Maintained for status consumers;
    /// no handler currently enforces turn order.
    #[must_use]
    pub fn current_turn_index(&self) -> usize {
        self.current_turn_index
    }

    /// All players, keyed by player identifier.
    #[must_use]
    pub fn players(&self) -> &BTreeMap<String, Player> {
        &self.players
    }

    /// All characters, keyed by character identifier.
    #[must_use]
    pub fn characters(&self) -> &BTreeMap<String, Character> {
        &self.characters
    }

    /// Looks up a character.
    #[must_use]
    pub fn character(&self, character_id: &str) -> Option<&Character> {
        self.characters.get(character_id)
    }

    /// The shared narrative record, in insertion order.
    #[must_use]
    pub fn public_log(&self) -> &[LogEntry] {
        &self.public_log
    }

    /// All accepted questions, in insertion order.
    #[must_use]
    pub fn qna_history(&self) -> &[QnaEntry] {
        &self.qna_history
    }

    /// All mission submissions, in insertion order.
    #[must_use]
    pub fn mission_submissions(&self) -> &[MissionSubmission] {
        &self.mission_submissions
    }

    /// When the session was created.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Adds or replaces a cast member. Used only during session creation.
    pub fn add_character(&mut self, character: Character) {
        self.characters
            .insert(character.character_id.clone(), character);
    }

    /// Binds a model to a character. Returns `false` if the character is
    /// unknown.
    pub fn bind_model(&mut self, character_id: &str, model_name: &str) -> bool {
        match self.characters.get_mut(character_id) {
            Some(character) => {
                character.model_name = Some(model_name.to_owned());
                true
            }
            None => false,
        }
    }

    /// The model to generate with for a character: the character's bound
    /// model wins over the caller's request, which wins over the session
    /// default.
    #[must_use]
    pub fn resolve_model(&self, character_id: &str, requested: Option<&str>) -> String {
        if let Some(bound) = self
            .characters
            .get(character_id)
            .and_then(|c| c.model_name.as_deref())
        {
            return bound.to_owned();
        }
        requested
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map_or_else(|| self.config.default_model.clone(), ToOwned::to_owned)
    }

    /// Adds a player and appends them to the turn order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] if the player identifier is
    /// already taken.
    pub fn add_player(&mut self, player: Player) -> Result<(), EngineError> {
        if self.players.contains_key(&player.player_id) {
            return Err(EngineError::Validation(format!(
                "player {} already joined this session",
                player.player_id
            )));
        }
        self.turn_order.push(player.player_id.clone());
        self.players.insert(player.player_id.clone(), player);
        Ok(())
    }

    /// Appends one entry to the public log. Always succeeds.
    pub fn append_log_entry(
        &mut self,
        kind: LogKind,
        text: String,
        related_player_id: Option<String>,
        related_character_id: Option<String>,
        at: DateTime<Utc>,
    ) -> LogEntry {
        let entry = LogEntry {
            id: Uuid::new_v4(),
            kind,
            text,
            related_player_id,
            related_character_id,
            at,
        };
        self.public_log.push(entry.clone());
        entry
    }

    /// Records an accepted question. The budget check is the caller's
    /// responsibility; mirroring into the public log is also the caller's
    /// job when `is_public` is set.
    pub fn record_qna(
        &mut self,
        questioner_id: String,
        target_character_id: String,
        question: String,
        answer: String,
        is_public: bool,
        at: DateTime<Utc>,
    ) -> QnaEntry {
        let entry = QnaEntry {
            id: Uuid::new_v4(),
            questioner_id,
            target_character_id,
            question,
            answer,
            is_public,
            act: self.current_act,
            at,
        };
        if let Some(player) = self.players.get_mut(&entry.questioner_id) {
            player.qna_count_current_act += 1;
        }
        self.qna_history.push(entry.clone());
        entry
    }

    /// Questions already recorded against a character in an act.
    #[must_use]
    pub fn qna_count_for(&self, character_id: &str, act: u32) -> u32 {
        let used = self
            .qna_history
            .iter()
            .filter(|q| q.target_character_id == character_id && q.act == act)
            .count();
        u32::try_from(used).unwrap_or(u32::MAX)
    }

    /// Whether a character may still be questioned in an act.
    #[must_use]
    pub fn can_ask_question(&self, character_id: &str, act: u32) -> bool {
        self.remaining_questions(character_id, act) > 0
    }

    /// Questions left in the shared (character, act) pool. Floors at zero.
    #[must_use]
    pub fn remaining_questions(&self, character_id: &str, act: u32) -> u32 {
        self.config
            .max_qna_per_character_per_act
            .saturating_sub(self.qna_count_for(character_id, act))
    }

    /// Records a mission submission. Always succeeds.
    pub fn record_mission_submission(
        &mut self,
        player_id: String,
        mission_type: String,
        content: String,
        at: DateTime<Utc>,
    ) -> MissionSubmission {
        let submission = MissionSubmission {
            id: Uuid::new_v4(),
            player_id,
            mission_type,
            content,
            at,
        };
        self.mission_submissions.push(submission.clone());
        submission
    }

    /// Advances to the next act: bumps the counter, resets every player's
    /// question count, and forces the phase back to `monologue`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PolicyRejection`] if the session is already in
    /// its final act; nothing is changed in that case.
    pub fn advance_act(&mut self) -> Result<ActAdvance, EngineError> {
        if self.current_act >= self.config.max_acts {
            return Err(EngineError::PolicyRejection(format!(
                "maximum act count {} reached, the game cannot advance further",
                self.config.max_acts
            )));
        }
        self.current_act += 1;
        let mut players_reset = 0;
        for player in self.players.values_mut() {
            player.qna_count_current_act = 0;
            players_reset += 1;
        }
        self.current_phase = GamePhase::Monologue;
        Ok(ActAdvance {
            new_act: self.current_act,
            players_reset,
        })
    }

    /// Overwrites the current phase. The caller is trusted to have validated
    /// the target against the known phase values.
    pub fn set_phase(&mut self, phase: GamePhase) {
        self.current_phase = phase;
    }
}
