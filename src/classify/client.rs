//! Classification Client
//!
//! Wraps a [`Classifier`] transport with request building, a per-call
//! timeout, bounded retries and strict response parsing.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::prompts::{build_classification_prompt, CLASSIFICATION_SYSTEM_PROMPT};
use super::retry::RetryPolicy;
use super::types::{ClassificationResult, RawClassification};
use super::utils::extract_json_object;
use super::ClassificationFailure;

/// Default per-call timeout for one classifier round-trip
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// A fully built classification request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationRequest {
    pub system: String,
    pub user: String,
}

impl ClassificationRequest {
    /// Deterministic request for a document's text
    pub fn for_text(text: &str) -> Self {
        Self {
            system: CLASSIFICATION_SYSTEM_PROMPT.to_string(),
            user: build_classification_prompt(text),
        }
    }
}

/// Remote classifier transport. Returns the raw reply text.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    async fn complete(&self, request: &ClassificationRequest) -> Result<String, ClassificationFailure>;
}

/// Builds requests, calls the classifier and validates the reply
pub struct ClassificationClient {
    classifier: Arc<dyn Classifier>,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl ClassificationClient {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier,
            retry: RetryPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Classify one document's text.
    ///
    /// `original_file_name` supplies the default suggested name.
    pub async fn classify(
        &self,
        text: &str,
        original_file_name: &str,
    ) -> Result<ClassificationResult, ClassificationFailure> {
        let request = ClassificationRequest::for_text(text);
        let reply = self.send_with_retry(&request, original_file_name).await?;

        tracing::debug!(
            file = %original_file_name,
            "[Classifier] Raw response: {}",
            reply
        );

        let result = parse_response(&reply, original_file_name);
        if let Err(e) = &result {
            tracing::warn!(file = %original_file_name, "[Classifier] {}", e);
        }
        result
    }

    /// Call the classifier, retrying transient failures with backoff
    async fn send_with_retry(
        &self,
        request: &ClassificationRequest,
        file: &str,
    ) -> Result<String, ClassificationFailure> {
        let mut attempt = 1;
        loop {
            let outcome = match tokio::time::timeout(
                self.request_timeout,
                self.classifier.complete(request),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(ClassificationFailure::ServiceUnavailable {
                    reason: format!(
                        "request timed out after {}s",
                        self.request_timeout.as_secs_f32()
                    ),
                }),
            };

            match outcome {
                Ok(reply) => return Ok(reply),
                Err(failure) if self.retry.should_retry(attempt, &failure) => {
                    let delay = self.retry.delay_for(attempt, &failure);
                    tracing::warn!(
                        file = %file,
                        classifier = self.classifier.name(),
                        "[Classifier] {}; retry {}/{} in {:?}",
                        failure,
                        attempt,
                        self.retry.max_attempts - 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(failure) => return Err(failure),
            }
        }
    }
}

/// Validate a raw classifier reply into a [`ClassificationResult`]
pub fn parse_response(
    reply: &str,
    original_file_name: &str,
) -> Result<ClassificationResult, ClassificationFailure> {
    let json_str = extract_json_object(reply).map_err(ClassificationFailure::parse)?;
    let value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| ClassificationFailure::parse(format!("invalid JSON: {}", e)))?;
    Ok(RawClassification::from_value(value)?.into_result(original_file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed sequence of outcomes and counts calls
    struct Scripted {
        replies: Mutex<VecDeque<Result<String, ClassificationFailure>>>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, ClassificationFailure>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Classifier for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _request: &ClassificationRequest) -> Result<String, ClassificationFailure> {
            *self.calls.lock().unwrap() += 1;
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ClassificationFailure::parse("script exhausted")))
        }
    }

    /// Never answers
    struct Hanging;

    #[async_trait]
    impl Classifier for Hanging {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn complete(&self, _request: &ClassificationRequest) -> Result<String, ClassificationFailure> {
            std::future::pending().await
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    const CHASE_REPLY: &str = r#"{"Document Type": "Bank Statement", "Suggested File Name": "Chase1234 From Jan1 to Jan31.pdf", "Folder Path": "Bank Statements", "Client First Name": "John", "Client Last Name": "Doe"}"#;

    #[test]
    fn test_request_is_deterministic() {
        let a = ClassificationRequest::for_text("Chase Bank ...1234");
        let b = ClassificationRequest::for_text("Chase Bank ...1234");
        assert_eq!(a, b);
        assert!(a.user.contains("Chase Bank ...1234"));
    }

    #[test]
    fn test_parse_response_fenced() {
        let reply = format!("Sure!\n```json\n{}\n```", CHASE_REPLY);
        let result = parse_response(&reply, "statement.pdf").unwrap();
        assert_eq!(result.folder_path, "Bank Statements");
        assert_eq!(result.client_last_name.as_deref(), Some("Doe"));
    }

    #[test]
    fn test_parse_response_with_braces_in_trailing_prose() {
        let reply = format!("{} (names use {{Last, First}})", CHASE_REPLY);
        let result = parse_response(&reply, "statement.pdf").unwrap();
        assert_eq!(result.document_type, "Bank Statement");
        assert_eq!(result.client_first_name.as_deref(), Some("John"));
    }

    #[test]
    fn test_parse_response_rejects_prose() {
        let err = parse_response("This looks like a bank statement.", "a.pdf").unwrap_err();
        assert!(matches!(err, ClassificationFailure::ResponseParseError { .. }));

        let err = parse_response("{ not: valid json }", "a.pdf").unwrap_err();
        assert!(matches!(err, ClassificationFailure::ResponseParseError { .. }));
    }

    #[tokio::test]
    async fn test_classify_success() {
        let script = Scripted::new(vec![Ok(CHASE_REPLY.to_string())]);
        let client = ClassificationClient::new(script.clone()).with_retry(fast_retry());

        let result = client.classify("Chase Bank", "statement.pdf").await.unwrap();
        assert_eq!(result.suggested_file_name, "Chase1234 From Jan1 to Jan31.pdf");
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let script = Scripted::new(vec![
            Err(ClassificationFailure::ServiceUnavailable {
                reason: "502".into(),
            }),
            Err(ClassificationFailure::RateLimited {
                retry_after_secs: None,
            }),
            Ok(CHASE_REPLY.to_string()),
        ]);
        let client = ClassificationClient::new(script.clone()).with_retry(fast_retry());

        assert!(client.classify("text", "a.pdf").await.is_ok());
        assert_eq!(script.calls(), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let unavailable = || {
            Err(ClassificationFailure::ServiceUnavailable {
                reason: "503".into(),
            })
        };
        let script = Scripted::new(vec![unavailable(), unavailable(), unavailable(), unavailable()]);
        let client = ClassificationClient::new(script.clone()).with_retry(fast_retry());

        let err = client.classify("text", "a.pdf").await.unwrap_err();
        assert!(matches!(err, ClassificationFailure::ServiceUnavailable { .. }));
        assert_eq!(script.calls(), 3);
    }

    #[tokio::test]
    async fn test_parse_failures_are_not_retried() {
        let script = Scripted::new(vec![
            Ok("I'm not sure what this is.".to_string()),
            Ok(CHASE_REPLY.to_string()),
        ]);
        let client = ClassificationClient::new(script.clone()).with_retry(fast_retry());

        let err = client.classify("text", "a.pdf").await.unwrap_err();
        assert!(matches!(err, ClassificationFailure::ResponseParseError { .. }));
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test]
    async fn test_auth_errors_are_not_retried() {
        let script = Scripted::new(vec![Err(ClassificationFailure::AuthError {
            reason: "invalid key".into(),
        })]);
        let client = ClassificationClient::new(script.clone()).with_retry(fast_retry());

        let err = client.classify("text", "a.pdf").await.unwrap_err();
        assert!(matches!(err, ClassificationFailure::AuthError { .. }));
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test]
    async fn test_timeout_becomes_service_unavailable() {
        let client = ClassificationClient::new(Arc::new(Hanging))
            .with_retry(RetryPolicy::none())
            .with_request_timeout(Duration::from_millis(20));

        let err = client.classify("text", "a.pdf").await.unwrap_err();
        assert!(matches!(err, ClassificationFailure::ServiceUnavailable { .. }));
    }
}
