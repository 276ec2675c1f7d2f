//! Retry wrapper for dialogue providers.
//!
//! The workflow service is a third-party network dependency that is
//! occasionally slow or briefly unavailable. Transient failures are retried
//! a bounded number of times with exponential backoff and jitter; anything
//! tagged `Unavailable` fails immediately.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use ravenhall_core::dialogue::{
    AnswerRequest, DialogueError, DialogueProvider, MonologueRequest,
};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retry attempts after the initial one (0 disables retries).
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Cap on the exponential delay growth, in milliseconds.
    pub max_delay_ms: u64,
    /// Jitter factor in `[0.0, 1.0]` applied around each delay.
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            jitter_factor: 0.2,
        }
    }
}

impl RetryConfig {
    /// A config with no delays, for tests.
    #[must_use]
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter_factor: 0.0,
        }
    }
}

/// Wraps any dialogue provider with retry logic.
pub struct ResilientProvider {
    inner: Arc<dyn DialogueProvider>,
    config: RetryConfig,
}

impl ResilientProvider {
    /// Wraps `inner` with the given retry configuration.
    #[must_use]
    pub fn new(inner: Arc<dyn DialogueProvider>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss
    )]
    fn delay_for(&self, attempt: u32) -> Duration {
        let exponential = self
            .config
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
        let capped = exponential.min(self.config.max_delay_ms);

        let jitter_range = (capped as f64 * self.config.jitter_factor) as i64;
        let millis = if jitter_range > 0 {
            let jitter = rand::rng().random_range(-jitter_range..=jitter_range);
            (capped as i64 + jitter).max(0) as u64
        } else {
            capped
        };
        Duration::from_millis(millis)
    }

    async fn with_retry<F, Fut>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> Result<String, DialogueError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<String, DialogueError>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match call().await {
                Ok(text) => {
                    if attempt > 0 {
                        tracing::info!(operation, attempt = attempt + 1, "generation succeeded after retry");
                    }
                    return Ok(text);
                }
                Err(DialogueError::Transient(reason)) => {
                    if attempt < self.config.max_retries {
                        let delay = self.delay_for(attempt + 1);
                        tracing::warn!(
                            operation,
                            attempt = attempt + 1,
                            max_retries = self.config.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            reason,
                            "transient generation failure, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(DialogueError::Transient(reason));
                }
                Err(err @ DialogueError::Unavailable(_)) => {
                    tracing::error!(operation, error = %err, "generation failed, not retryable");
                    return Err(err);
                }
            }
        }

        let error = last_error
            .unwrap_or_else(|| DialogueError::Transient("no attempts were made".to_owned()));
        tracing::error!(
            operation,
            attempts = self.config.max_retries + 1,
            error = %error,
            "generation failed after all retry attempts"
        );
        Err(error)
    }
}

#[async_trait]
impl DialogueProvider for ResilientProvider {
    async fn generate_monologue(
        &self,
        request: &MonologueRequest,
    ) -> Result<String, DialogueError> {
        self.with_retry("generate_monologue", || {
            self.inner.generate_monologue(request)
        })
        .await
    }

    async fn generate_answer(&self, request: &AnswerRequest) -> Result<String, DialogueError> {
        self.with_retry("generate_answer", || self.inner.generate_answer(request))
            .await
    }
}
