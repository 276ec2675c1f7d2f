//! HTTP surface of the Ravenhall game engine.

pub mod error;
pub mod routes;
pub mod state;
