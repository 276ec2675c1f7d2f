//! Ravenhall — mystery script catalog.
//!
//! A script is the authored content a session is created from: a title and
//! the cast of characters. Scripts are read-only at runtime; the engine
//! never mutates them.

pub mod catalog;
pub mod script;

pub use catalog::{ContentError, InMemoryScriptCatalog, ScriptCatalog, YamlScriptCatalog};
pub use script::{CharacterDef, Script};
