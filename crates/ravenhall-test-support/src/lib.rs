//! Shared test fakes for the Ravenhall mystery session engine.

mod clock;
mod dialogue;
mod store;

pub use clock::FixedClock;
pub use dialogue::{FlakyDialogueProvider, StubDialogueProvider};
pub use store::{FailingSessionStore, InMemorySessionStore};
