//! OpenAI-compatible chat-completions transport

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::client::{ClassificationRequest, Classifier};
use super::ClassificationFailure;

/// Classifier backed by `POST {base_url}/v1/chat/completions`
pub struct OpenAiClassifier {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl OpenAiClassifier {
    pub fn new(
        api_key: SecretString,
        base_url: impl Into<String>,
        model: impl Into<String>,
        max_idle_connections: usize,
    ) -> Result<Self, reqwest::Error> {
        // Per-call deadlines are enforced by ClassificationClient; this is a backstop
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .pool_max_idle_per_host(max_idle_connections)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ClassificationRequest) -> Result<String, ClassificationFailure> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.api_key.expose_secret())
            .json(&serde_json::json!({
                "model": self.model,
                "temperature": 0,
                "response_format": { "type": "json_object" },
                "messages": [
                    { "role": "system", "content": request.system },
                    { "role": "user", "content": request.user }
                ]
            }))
            .send()
            .await
            .map_err(|e| ClassificationFailure::ServiceUnavailable {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            let body = response.text().await.unwrap_or_default();
            return Err(failure_for_status(status, retry_after, &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ClassificationFailure::ServiceUnavailable {
                reason: format!("failed to read response body: {}", e),
            })?;

        extract_content(&body)
    }
}

/// Pull the assistant message out of a chat-completions envelope
fn extract_content(body: &str) -> Result<String, ClassificationFailure> {
    let envelope: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ClassificationFailure::parse(format!("unexpected response envelope: {}", e)))?;

    let content = envelope
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(ClassificationFailure::parse("classifier returned empty content"));
    }
    Ok(content)
}

/// Map a non-success HTTP status to a failure kind
fn failure_for_status(
    status: StatusCode,
    retry_after_secs: Option<u64>,
    body: &str,
) -> ClassificationFailure {
    let reason = format!("HTTP {}: {}", status.as_u16(), truncate_body(body));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClassificationFailure::AuthError { reason },
        StatusCode::TOO_MANY_REQUESTS => ClassificationFailure::RateLimited { retry_after_secs },
        StatusCode::REQUEST_TIMEOUT => ClassificationFailure::ServiceUnavailable { reason },
        s if s.is_server_error() => ClassificationFailure::ServiceUnavailable { reason },
        s => ClassificationFailure::RequestRejected {
            status: s.as_u16(),
            reason,
        },
    }
}

/// Parse a `Retry-After` header: delay in seconds, or an HTTP date
fn parse_retry_after(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(secs);
    }

    chrono::DateTime::parse_from_rfc2822(value).ok().map(|at| {
        let wait = at.timestamp() - chrono::Utc::now().timestamp();
        wait.max(0) as u64
    })
}

fn truncate_body(body: &str) -> &str {
    const MAX_BODY: usize = 300;
    match body.char_indices().nth(MAX_BODY) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
