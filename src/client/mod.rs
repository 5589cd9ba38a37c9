//! Chat client: posts messages to the `/chat` endpoint and renders replies
//! into a [`ChatWidget`] transcript.

mod widget;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::Duration;

use crate::api::ChatRequest;

pub use widget::{meta_line, Bubble, ChatWidget, Sender, Transcript, CONTACT_ERROR};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Response body as the widget reads it; every field is optional.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ChatReplyBody {
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub meta: Option<WireMeta>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct WireMeta {
    #[serde(default)]
    pub intent_tag: Option<String>,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub log_tx_hash: Option<String>,
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReplyBody, ClientError>;
}

pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ChatClient {
    pub fn new(endpoint: impl Into<String>, timeout_ms: u64) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    /// The body is decoded whatever the HTTP status; error replies carry an
    /// `error` field.
    async fn send(&self, request: &ChatRequest) -> Result<ChatReplyBody, ClientError> {
        let response = self.http.post(&self.endpoint).json(request).send().await?;
        tracing::debug!(status = %response.status(), "chat response");
        Ok(response.json::<ChatReplyBody>().await?)
    }
}

/// Submits the widget's input and renders the result. At most one request is
/// issued; blank input issues none.
pub async fn send_message<B>(widget: &mut ChatWidget, backend: &B)
where
    B: ChatBackend + ?Sized,
{
    let Some(request) = widget.submit() else {
        return;
    };
    let outcome = backend.send(&request).await;
    widget.complete(outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatBackend for CountingBackend {
        async fn send(&self, request: &ChatRequest) -> Result<ChatReplyBody, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ChatReplyBody {
                reply: Some(format!("echo {}", request.message)),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn blank_input_issues_no_request() {
        let backend = CountingBackend::default();
        let mut widget = ChatWidget::new("s1");
        widget.input = "   ".to_string();

        send_message(&mut widget, &backend).await;

        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert!(widget.transcript().is_empty());
    }

    #[tokio::test]
    async fn one_request_per_submission() {
        let backend = CountingBackend::default();
        let mut widget = ChatWidget::new("s1");
        widget.input = "hello".to_string();

        send_message(&mut widget, &backend).await;

        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        let texts: Vec<_> = widget
            .transcript()
            .bubbles()
            .iter()
            .map(|b| (b.sender, b.text.as_str()))
            .collect();
        assert_eq!(texts, vec![(Sender::User, "hello"), (Sender::Bot, "echo hello")]);
    }

    #[test]
    fn decodes_partial_bodies() {
        let body: ChatReplyBody = serde_json::from_str(r#"{"error":"Empty message"}"#).unwrap();
        assert_eq!(body.error.as_deref(), Some("Empty message"));
        assert!(body.reply.is_none());

        let body: ChatReplyBody = serde_json::from_str(
            r#"{"reply":"hi","meta":{"intent_tag":"greeting","model_version":"v1","log_tx_hash":null}}"#,
        )
        .unwrap();
        let meta = body.meta.unwrap();
        assert_eq!(meta.intent_tag.as_deref(), Some("greeting"));
        assert!(meta.log_tx_hash.is_none());
    }
}
