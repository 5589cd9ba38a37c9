use std::fmt;

use crate::api::ChatRequest;

use super::{ChatReplyBody, ClientError, WireMeta};

pub const CONTACT_ERROR: &str = "Error contacting server.";
const TX_HASH_PREVIEW_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bubble {
    pub sender: Sender,
    pub text: String,
    pub meta: Option<String>,
}

impl fmt::Display for Bubble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.sender {
            Sender::User => "you",
            Sender::Bot => "bot",
        };
        write!(f, "{label}: {}", self.text)?;
        if let Some(meta) = &self.meta {
            write!(f, "\n     ({meta})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct Transcript {
    bubbles: Vec<Bubble>,
}

impl Transcript {
    pub fn bubbles(&self) -> &[Bubble] {
        &self.bubbles
    }

    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }

    /// Meta is only ever shown on bot bubbles.
    fn append(&mut self, text: impl Into<String>, sender: Sender, meta: Option<&WireMeta>) {
        let meta = match sender {
            Sender::Bot => meta.map(meta_line),
            Sender::User => None,
        };
        self.bubbles.push(Bubble {
            sender,
            text: text.into(),
            meta,
        });
    }
}

/// `intent: <tag>, model: <version>` plus a shortened log tx hash when known.
pub fn meta_line(meta: &WireMeta) -> String {
    let mut line = format!(
        "intent: {}, model: {}",
        meta.intent_tag.as_deref().unwrap_or("unknown"),
        meta.model_version.as_deref().unwrap_or("unknown"),
    );
    if let Some(hash) = meta.log_tx_hash.as_deref().filter(|h| !h.is_empty()) {
        let preview: String = hash.chars().take(TX_HASH_PREVIEW_CHARS).collect();
        line.push_str(&format!(", log tx: {preview}..."));
    }
    line
}

/// Input line, transcript and session of one chat conversation.
#[derive(Debug, Clone)]
pub struct ChatWidget {
    pub input: String,
    transcript: Transcript,
    session_id: String,
}

impl ChatWidget {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            input: String::new(),
            transcript: Transcript::default(),
            session_id: session_id.into(),
        }
    }

    pub fn with_random_session() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Takes the trimmed input. When it is non-empty, appends the user bubble,
    /// clears the input and returns the request to send.
    pub fn submit(&mut self) -> Option<ChatRequest> {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return None;
        }

        self.transcript.append(text.as_str(), Sender::User, None);
        self.input.clear();

        Some(ChatRequest {
            message: text,
            session_id: Some(self.session_id.clone()),
        })
    }

    /// Renders the outcome of a submitted request.
    pub fn complete(&mut self, outcome: Result<ChatReplyBody, ClientError>) {
        match outcome {
            Ok(body) => {
                if let Some(reply) = body.reply.filter(|r| !r.is_empty()) {
                    self.transcript.append(reply, Sender::Bot, body.meta.as_ref());
                } else if let Some(error) = body.error.filter(|e| !e.is_empty()) {
                    self.transcript.append(format!("Error: {error}"), Sender::Bot, None);
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "chat request failed");
                self.transcript.append(CONTACT_ERROR, Sender::Bot, None);
            }
        }
    }
}
