//! HTTP client for the external AI workflow service.
//!
//! The service exposes one endpoint per workflow; requests carry an `inputs`
//! object, a caller identifier, and a bearer key selected by workflow kind.
//! Wire details beyond this narrow surface are the service's concern.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

pub use ravenhall_core::dialogue::DEFAULT_MODEL;
use ravenhall_core::dialogue::{
    AnswerRequest, DialogueError, DialogueProvider, EMPTY_HISTORY_DIGEST, MonologueRequest,
};

/// Placeholder forwarded when the caller identifier is empty or whitespace.
const ANONYMOUS_CALLER: &str = "anonymous_user";

/// Placeholder forwarded when the character identifier is empty.
const UNKNOWN_CHARACTER: &str = "unknown_character";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Which workflow to invoke.
#[derive(Debug, Clone, Copy)]
enum WorkflowKind {
    Monologue,
    Qna,
}

impl WorkflowKind {
    fn name(self) -> &'static str {
        match self {
            Self::Monologue => "monologue",
            Self::Qna => "qna",
        }
    }
}

/// Client for the AI workflow service.
#[derive(Clone)]
pub struct WorkflowClient {
    http: reqwest::Client,
    endpoint: String,
    monologue_key: String,
    qna_key: String,
}

impl WorkflowClient {
    /// Creates a client with the default request timeout.
    #[must_use]
    pub fn new(endpoint: &str, monologue_key: &str, qna_key: &str) -> Self {
        Self::with_timeout(
            endpoint,
            monologue_key,
            qna_key,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Creates a client with a custom request timeout.
    #[must_use]
    pub fn with_timeout(
        endpoint: &str,
        monologue_key: &str,
        qna_key: &str,
        timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            monologue_key: monologue_key.to_owned(),
            qna_key: qna_key.to_owned(),
        }
    }

    async fn invoke(
        &self,
        kind: WorkflowKind,
        inputs: Value,
        caller_id: &str,
    ) -> Result<String, DialogueError> {
        let key = match kind {
            WorkflowKind::Monologue => &self.monologue_key,
            WorkflowKind::Qna => &self.qna_key,
        };
        if key.is_empty() {
            return Err(DialogueError::Unavailable(format!(
                "no API key configured for the {} workflow",
                kind.name()
            )));
        }

        let body = json!({
            "inputs": inputs,
            "user": sanitize_caller(caller_id),
            "response_mode": "blocking",
        });

        tracing::debug!(workflow = kind.name(), "invoking dialogue workflow");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DialogueError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(DialogueError::Transient(format!(
                "{} workflow returned {status}",
                kind.name()
            )));
        }
        if !status.is_success() {
            return Err(DialogueError::Unavailable(format!(
                "{} workflow returned {status}",
                kind.name()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| DialogueError::Unavailable(format!("unreadable response: {e}")))?;

        extract_text(&payload).ok_or_else(|| {
            DialogueError::Unavailable(format!("{} workflow returned no text", kind.name()))
        })
    }
}

#[async_trait]
impl DialogueProvider for WorkflowClient {
    async fn generate_monologue(
        &self,
        request: &MonologueRequest,
    ) -> Result<String, DialogueError> {
        let inputs = json!({
            "char_id": non_empty_or(&request.character_id, UNKNOWN_CHARACTER),
            "act_num": request.act,
            "model_name": non_empty_or(&request.model, DEFAULT_MODEL),
        });
        self.invoke(WorkflowKind::Monologue, inputs, &request.caller_id)
            .await
    }

    async fn generate_answer(&self, request: &AnswerRequest) -> Result<String, DialogueError> {
        if request.question.trim().is_empty() {
            return Err(DialogueError::Unavailable(
                "refusing to forward an empty question".to_owned(),
            ));
        }
        let inputs = json!({
            "char_id": non_empty_or(&request.character_id, UNKNOWN_CHARACTER),
            "act_num": request.act,
            "query": request.question.trim(),
            "model_name": non_empty_or(&request.model, DEFAULT_MODEL),
            "history": non_empty_or(&request.history_digest, EMPTY_HISTORY_DIGEST),
        });
        self.invoke(WorkflowKind::Qna, inputs, &request.caller_id)
            .await
    }
}

fn sanitize_caller(caller_id: &str) -> &str {
    let trimmed = caller_id.trim();
    if trimmed.is_empty() {
        ANONYMOUS_CALLER
    } else {
        trimmed
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() { fallback } else { trimmed }
}

/// Pulls the generated text out of a workflow response.
///
/// Responses nest their result under `data.outputs`; the output field name
/// varies by workflow, so well-known names are tried first and any non-empty
/// string value accepted as a fallback.
fn extract_text(payload: &Value) -> Option<String> {
    let outputs = payload
        .pointer("/data/outputs")
        .or_else(|| payload.get("outputs"))?;
    let outputs = outputs.as_object()?;

    for field in ["answer", "result", "output", "text", "content"] {
        if let Some(text) = outputs.get(field).and_then(Value::as_str)
            && !text.trim().is_empty()
        {
            return Some(text.trim().to_owned());
        }
    }
    outputs
        .values()
        .find_map(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_reads_well_known_output_fields() {
        let payload = json!({"data": {"outputs": {"answer": "I was in the library."}}});

        assert_eq!(
            extract_text(&payload).as_deref(),
            Some("I was in the library.")
        );
    }

    #[test]
    fn test_extract_text_falls_back_to_any_string_output() {
        let payload = json!({"data": {"outputs": {"narration": "The butler paled."}}});

        assert_eq!(extract_text(&payload).as_deref(), Some("The butler paled."));
    }

    #[test]
    fn test_extract_text_rejects_empty_outputs() {
        let payload = json!({"data": {"outputs": {"answer": "   "}}});

        assert_eq!(extract_text(&payload), None);
    }

    #[test]
    fn test_sanitize_caller_substitutes_placeholder_for_blank_ids() {
        assert_eq!(sanitize_caller("  "), ANONYMOUS_CALLER);
        assert_eq!(sanitize_caller(""), ANONYMOUS_CALLER);
        assert_eq!(sanitize_caller(" alice "), "alice");
    }

    #[tokio::test]
    async fn test_generate_answer_refuses_empty_question() {
        let client = WorkflowClient::new("http://localhost:9999", "key-a", "key-b");
        let request = AnswerRequest {
            character_id: "inspector".to_owned(),
            act: 1,
            question: "   ".to_owned(),
            history_digest: String::new(),
            model: String::new(),
            caller_id: "alice".to_owned(),
        };

        let err = client.generate_answer(&request).await.unwrap_err();

        assert!(matches!(err, DialogueError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_not_retried_as_transient() {
        let client = WorkflowClient::new("http://localhost:9999", "", "");
        let request = MonologueRequest {
            character_id: "inspector".to_owned(),
            act: 1,
            model: DEFAULT_MODEL.to_owned(),
            caller_id: "alice".to_owned(),
        };

        let err = client.generate_monologue(&request).await.unwrap_err();

        assert!(matches!(err, DialogueError::Unavailable(_)));
    }
}
