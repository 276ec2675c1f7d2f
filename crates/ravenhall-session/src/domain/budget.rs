//! Interrogation budget — the read-side policy over the session record.
//!
//! The quota is scoped to (character, act), not (questioner, character,
//! act): any number of distinct questioners draw from one shared pool per
//! character per act. This bounds how much of each character's secrets can
//! be exposed per act; a per-player quota would under-restrict.

use super::session::Session;

/// Read-only view answering "may this character be questioned again?".
#[derive(Debug, Clone, Copy)]
pub struct QnaBudget<'a> {
    session: &'a Session,
}

impl<'a> QnaBudget<'a> {
    /// Wraps a session.
    #[must_use]
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Whether the shared pool for `(character_id, act)` still has room.
    #[must_use]
    pub fn can_ask(&self, character_id: &str, act: u32) -> bool {
        self.session.can_ask_question(character_id, act)
    }

    /// Questions left in the shared pool for `(character_id, act)`.
    #[must_use]
    pub fn remaining(&self, character_id: &str, act: u32) -> u32 {
        self.session.remaining_questions(character_id, act)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::{Character, Player, SessionConfig};
    use chrono::{TimeZone, Utc};

    fn session_with_quota(quota: u32) -> Session {
        let mut session = Session::new(
            "game_1".to_owned(),
            "manor".to_owned(),
            "session_1".to_owned(),
            SessionConfig {
                max_qna_per_character_per_act: quota,
                ..SessionConfig::default()
            },
            Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap(),
        );
        session.add_character(Character {
            character_id: "butler".to_owned(),
            name: "The Butler".to_owned(),
            avatar: String::new(),
            description: String::new(),
            model_name: None,
        });
        for id in ["alice", "bob", "carol"] {
            session
                .add_player(Player::human(id.to_owned(), None))
                .unwrap();
        }
        session
    }

    #[test]
    fn test_distinct_questioners_share_one_pool_per_character_per_act() {
        let mut session = session_with_quota(2);
        let now = session.started_at();
        session.record_qna(
            "alice".to_owned(),
            "butler".to_owned(),
            "Who rang the bell?".to_owned(),
            "I did.".to_owned(),
            true,
            now,
        );
        session.record_qna(
            "bob".to_owned(),
            "butler".to_owned(),
            "At what time?".to_owned(),
            "Nine.".to_owned(),
            true,
            now,
        );

        let budget = QnaBudget::new(&session);

        // Carol never asked anything, yet the pool is exhausted.
        assert!(!budget.can_ask("butler", 1));
        assert_eq!(budget.remaining("butler", 1), 0);
    }

    #[test]
    fn test_pool_is_scoped_per_act() {
        let mut session = session_with_quota(1);
        let now = session.started_at();
        session.record_qna(
            "alice".to_owned(),
            "butler".to_owned(),
            "Well?".to_owned(),
            "Indeed.".to_owned(),
            true,
            now,
        );

        let budget = QnaBudget::new(&session);

        assert_eq!(budget.remaining("butler", 1), 0);
        assert_eq!(budget.remaining("butler", 2), 1);
    }
}
