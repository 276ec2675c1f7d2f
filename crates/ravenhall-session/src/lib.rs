//! Ravenhall — session engine for turn-structured mystery games.
//!
//! Tracks per-session phase and act progression, per-character interrogation
//! budgets, and an append-only public narrative log, and dispatches player
//! and AI actions against that state. Dialogue text itself comes from an
//! external provider behind the [`ravenhall_core::dialogue`] port.

pub mod application;
pub mod domain;
