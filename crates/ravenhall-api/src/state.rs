//! Shared application state.

use std::sync::Arc;

use ravenhall_content::catalog::ScriptCatalog;
use ravenhall_core::clock::Clock;
use ravenhall_core::dialogue::DialogueProvider;
use ravenhall_core::store::SessionStore;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session snapshot persistence.
    pub store: Arc<dyn SessionStore>,
    /// Generates monologue and answer text.
    pub dialogue: Arc<dyn DialogueProvider>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Resolves scripts by identifier.
    pub scripts: Arc<dyn ScriptCatalog>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        dialogue: Arc<dyn DialogueProvider>,
        clock: Arc<dyn Clock>,
        scripts: Arc<dyn ScriptCatalog>,
    ) -> Self {
        Self {
            store,
            dialogue,
            clock,
            scripts,
        }
    }
}
