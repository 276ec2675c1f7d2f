//! Test dialogue providers.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use ravenhall_core::dialogue::{
    AnswerRequest, DialogueError, DialogueProvider, MonologueRequest,
};

/// A dialogue provider that records every request and returns canned text.
#[derive(Debug)]
pub struct StubDialogueProvider {
    monologue_reply: String,
    answer_reply: String,
    monologue_requests: Mutex<Vec<MonologueRequest>>,
    answer_requests: Mutex<Vec<AnswerRequest>>,
}

impl StubDialogueProvider {
    /// Creates a stub returning the given texts for every request.
    #[must_use]
    pub fn new(monologue_reply: &str, answer_reply: &str) -> Self {
        Self {
            monologue_reply: monologue_reply.to_owned(),
            answer_reply: answer_reply.to_owned(),
            monologue_requests: Mutex::new(Vec::new()),
            answer_requests: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of all monologue requests received.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn monologue_requests(&self) -> Vec<MonologueRequest> {
        self.monologue_requests.lock().unwrap().clone()
    }

    /// Snapshot of all answer requests received.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn answer_requests(&self) -> Vec<AnswerRequest> {
        self.answer_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DialogueProvider for StubDialogueProvider {
    async fn generate_monologue(
        &self,
        request: &MonologueRequest,
    ) -> Result<String, DialogueError> {
        self.monologue_requests.lock().unwrap().push(request.clone());
        Ok(self.monologue_reply.clone())
    }

    async fn generate_answer(&self, request: &AnswerRequest) -> Result<String, DialogueError> {
        self.answer_requests.lock().unwrap().push(request.clone());
        Ok(self.answer_reply.clone())
    }
}

enum FlakyMode {
    TransientThenOk { failures: u32, reply: String },
    AlwaysUnavailable,
}

/// A dialogue provider with scripted failures, for retry and degradation
/// tests.
pub struct FlakyDialogueProvider {
    mode: FlakyMode,
    calls: AtomicU32,
}

impl FlakyDialogueProvider {
    /// Fails with a transient error `failures` times, then succeeds with
    /// `reply` forever.
    #[must_use]
    pub fn transient_failures(failures: u32, reply: &str) -> Self {
        Self {
            mode: FlakyMode::TransientThenOk {
                failures,
                reply: reply.to_owned(),
            },
            calls: AtomicU32::new(0),
        }
    }

    /// Fails every call with an `Unavailable` error.
    #[must_use]
    pub fn always_unavailable() -> Self {
        Self {
            mode: FlakyMode::AlwaysUnavailable,
            calls: AtomicU32::new(0),
        }
    }

    /// Total calls received across both capabilities.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Result<String, DialogueError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            FlakyMode::TransientThenOk { failures, reply } => {
                if call < *failures {
                    Err(DialogueError::Transient("simulated timeout".to_owned()))
                } else {
                    Ok(reply.clone())
                }
            }
            FlakyMode::AlwaysUnavailable => Err(DialogueError::Unavailable(
                "simulated outage".to_owned(),
            )),
        }
    }
}

#[async_trait]
impl DialogueProvider for FlakyDialogueProvider {
    async fn generate_monologue(
        &self,
        _request: &MonologueRequest,
    ) -> Result<String, DialogueError> {
        self.next()
    }

    async fn generate_answer(&self, _request: &AnswerRequest) -> Result<String, DialogueError> {
        self.next()
    }
}
