//! Script definitions.

use serde::{Deserialize, Serialize};

/// A character as authored in a script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterDef {
    /// Stable character identifier, unique within the script.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Avatar image reference.
    #[serde(default)]
    pub avatar: String,
    /// Public-facing character description.
    #[serde(default)]
    pub description: String,
}

/// An authored mystery script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    /// Stable script identifier.
    pub script_id: String,
    /// Display title.
    pub title: String,
    /// The cast.
    pub characters: Vec<CharacterDef>,
}

impl Script {
    /// Returns an error message if the script is not internally consistent.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found: an empty cast or a
    /// duplicated character identifier.
    pub fn validate(&self) -> Result<(), String> {
        if self.characters.is_empty() {
            return Err(format!("script {} has no characters", self.script_id));
        }
        let mut seen = std::collections::BTreeSet::new();
        for character in &self.characters {
            if !seen.insert(character.id.as_str()) {
                return Err(format!(
                    "script {} declares character {} more than once",
                    self.script_id, character.id
                ));
            }
        }
        Ok(())
    }
}
