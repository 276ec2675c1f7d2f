//! Script catalog port and implementations.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::script::Script;

/// Errors raised by script catalogs.
#[derive(Debug, Error)]
pub enum ContentError {
    /// No script exists for the given identifier.
    #[error("script not found: {0}")]
    NotFound(String),

    /// The script exists but could not be read or parsed.
    #[error("failed to load script {script_id}: {reason}")]
    Load {
        /// The script that failed to load.
        script_id: String,
        /// What went wrong.
        reason: String,
    },
}

/// Port for resolving scripts by identifier.
#[async_trait]
pub trait ScriptCatalog: Send + Sync {
    /// Returns the script for `script_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::NotFound`] for unknown identifiers and
    /// [`ContentError::Load`] when the script cannot be read or is invalid.
    async fn get(&self, script_id: &str) -> Result<Script, ContentError>;
}

/// Catalog backed by a fixed in-memory set of scripts.
#[derive(Debug, Default)]
pub struct InMemoryScriptCatalog {
    scripts: HashMap<String, Script>,
}

impl InMemoryScriptCatalog {
    /// Builds a catalog from the given scripts, keyed by `script_id`.
    #[must_use]
    pub fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
        Self {
            scripts: scripts
                .into_iter()
                .map(|s| (s.script_id.clone(), s))
                .collect(),
        }
    }
}

#[async_trait]
impl ScriptCatalog for InMemoryScriptCatalog {
    async fn get(&self, script_id: &str) -> Result<Script, ContentError> {
        self.scripts
            .get(script_id)
            .cloned()
            .ok_or_else(|| ContentError::NotFound(script_id.to_owned()))
    }
}

/// Catalog that reads `{dir}/{script_id}.yaml` on demand.
#[derive(Debug, Clone)]
pub struct YamlScriptCatalog {
    dir: PathBuf,
}

impl YamlScriptCatalog {
    /// Creates a catalog rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ScriptCatalog for YamlScriptCatalog {
    async fn get(&self, script_id: &str) -> Result<Script, ContentError> {
        // Script identifiers come from clients; refuse anything that could
        // escape the catalog directory.
        if script_id.is_empty() || script_id.contains(['/', '\\', '.']) {
            return Err(ContentError::NotFound(script_id.to_owned()));
        }

        let path = self.dir.join(format!("{script_id}.yaml"));
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ContentError::NotFound(script_id.to_owned()));
            }
            Err(e) => {
                return Err(ContentError::Load {
                    script_id: script_id.to_owned(),
                    reason: e.to_string(),
                });
            }
        };

        let script: Script = serde_yaml::from_str(&raw).map_err(|e| ContentError::Load {
            script_id: script_id.to_owned(),
            reason: e.to_string(),
        })?;
        script.validate().map_err(|reason| ContentError::Load {
            script_id: script_id.to_owned(),
            reason,
        })?;

        tracing::debug!(script_id, characters = script.characters.len(), "loaded script");
        Ok(script)
    }
}
