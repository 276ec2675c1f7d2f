//! Dialogue provider abstraction.
//!
//! The dialogue provider is an external AI workflow service reached through
//! two narrow capabilities: character monologue generation and character
//! question answering. Both may fail or time out; the engine recovers from
//! failure with degraded fallback text rather than failing the action, and
//! [`Generated`] keeps the two outcomes distinguishable.

use async_trait::async_trait;
use thiserror::Error;

/// Maximum length, in characters, of the history digest forwarded to the
/// provider.
pub const MAX_HISTORY_DIGEST_LEN: usize = 256;

/// Model used when neither the character binding nor the caller names one.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Digest used when a session has no history to forward.
pub const EMPTY_HISTORY_DIGEST: &str = "No history yet.";

const TRUNCATION_MARKER: &str = "...(truncated)";

/// Errors the dialogue provider can fail with.
#[derive(Debug, Clone, Error)]
pub enum DialogueError {
    /// A transient failure (timeout, connection error, 5xx). Retryable.
    #[error("transient dialogue failure: {0}")]
    Transient(String),

    /// The provider is unavailable or rejected the request. Not retryable.
    #[error("dialogue provider unavailable: {0}")]
    Unavailable(String),
}

/// Text produced for an action, tagged with whether generation succeeded or
/// the engine substituted fallback text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generated {
    /// The provider produced this text.
    Ok(String),
    /// The provider failed; this is locally substituted fallback text.
    Degraded {
        /// The fallback text shown to players.
        text: String,
        /// Why generation failed.
        reason: String,
    },
}

impl Generated {
    /// The text to record, regardless of provenance.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Ok(text) | Self::Degraded { text, .. } => text,
        }
    }

    /// Whether this text is substituted fallback rather than provider output.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// Request for a character's self-introduction monologue.
#[derive(Debug, Clone)]
pub struct MonologueRequest {
    /// The character introducing themselves.
    pub character_id: String,
    /// Current act number, 1-indexed.
    pub act: u32,
    /// Model to generate with.
    pub model: String,
    /// Identifier of the requesting caller.
    pub caller_id: String,
}

/// Request for a character's answer to a player question.
#[derive(Debug, Clone)]
pub struct AnswerRequest {
    /// The character being questioned.
    pub character_id: String,
    /// Current act number, 1-indexed.
    pub act: u32,
    /// The question posed.
    pub question: String,
    /// Pre-truncated conversation history, at most
    /// [`MAX_HISTORY_DIGEST_LEN`] characters.
    pub history_digest: String,
    /// Model to generate with.
    pub model: String,
    /// Identifier of the requesting caller.
    pub caller_id: String,
}

/// Port for generating character dialogue.
#[async_trait]
pub trait DialogueProvider: Send + Sync {
    /// Generates a self-introduction monologue for a character.
    ///
    /// # Errors
    ///
    /// Returns [`DialogueError`] if generation fails after any internal
    /// retries.
    async fn generate_monologue(&self, request: &MonologueRequest)
    -> Result<String, DialogueError>;

    /// Generates a character's answer to a question.
    ///
    /// # Errors
    ///
    /// Returns [`DialogueError`] if generation fails after any internal
    /// retries.
    async fn generate_answer(&self, request: &AnswerRequest) -> Result<String, DialogueError>;
}

/// Builds the history digest forwarded with answer requests.
///
/// When the joined lines exceed `max_len` characters, lines mentioning the
/// target character are retained first (most recent first), then other recent
/// lines, and the result is hard-truncated with a trailing marker if a single
/// kept line still overflows.
#[must_use]
pub fn history_digest(lines: &[String], character_id: &str, max_len: usize) -> String {
    let joined = lines.join("\n");
    if joined.chars().count() <= max_len {
        return joined;
    }

    let target = max_len.saturating_sub(TRUNCATION_MARKER.chars().count());
    let (relevant, other): (Vec<&String>, Vec<&String>) =
        lines.iter().partition(|line| line.contains(character_id));

    let mut kept: std::collections::VecDeque<&str> = std::collections::VecDeque::new();
    let mut used = 0usize;
    for line in relevant.iter().rev() {
        let cost = line.chars().count() + 1;
        if used + cost > target {
            break;
        }
        kept.push_front(line.as_str());
        used += cost;
    }
    for line in other.iter().rev() {
        let cost = line.chars().count() + 1;
        if used + cost > target {
            break;
        }
        kept.push_front(line.as_str());
        used += cost;
    }

    let mut result = kept.into_iter().collect::<Vec<_>>().join("\n");
    if result.chars().count() > target {
        result = result.chars().take(target).collect();
    }
    result.push_str(TRUNCATION_MARKER);
    result
}
