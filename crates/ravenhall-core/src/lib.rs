//! Ravenhall Core — shared abstractions.
//!
//! This crate defines the traits and error types every other crate depends
//! on: the engine error taxonomy, the clock port, the session store port,
//! and the dialogue provider port. It contains no infrastructure code.

pub mod clock;
pub mod dialogue;
pub mod error;
pub mod store;
