//! Domain model for mystery sessions.

pub mod actions;
pub mod budget;
pub mod session;
