//! Ravenhall — dialogue provider infrastructure.
//!
//! Implements the [`ravenhall_core::dialogue::DialogueProvider`] port against
//! the external AI workflow HTTP service, and a resilience wrapper that adds
//! bounded exponential-backoff retries for transient failures.

pub mod client;
pub mod retry;

pub use client::{DEFAULT_MODEL, WorkflowClient};
pub use retry::{ResilientProvider, RetryConfig};
