use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::intent::IntentMeta;

const MAX_SESSION_ID_LEN: usize = 128;

#[derive(Debug, thiserror::Error)]
pub enum SessionLogError {
    #[error("invalid session id")]
    InvalidSessionId,
    #[error("failed to write session log {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode log entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One line of a session's JSONL log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub session_id: String,
    pub user_message: String,
    pub bot_reply: String,
    pub intent_tag: String,
    pub model_version: String,
    pub dataset_id: String,
}

impl LogEntry {
    pub fn new(session_id: &str, user_message: &str, bot_reply: &str, meta: &IntentMeta) -> Self {
        Self {
            timestamp: chrono::Utc::now()
                .format("%Y-%m-%dT%H:%M:%S%.6fZ")
                .to_string(),
            session_id: session_id.to_string(),
            user_message: user_message.to_string(),
            bot_reply: bot_reply.to_string(),
            intent_tag: meta.intent_tag.clone(),
            model_version: meta.model_version.clone(),
            dataset_id: meta.dataset_id.clone(),
        }
    }
}

/// Session ids become file names, so only `[A-Za-z0-9_-]` is accepted.
pub fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Append-only JSONL logs, one file per session under `dir`.
pub struct SessionLog {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl SessionLog {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, SessionLogError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| SessionLogError::Io {
                path: dir.clone(),
                source,
            })?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, session_id: &str) -> Result<PathBuf, SessionLogError> {
        if !is_valid_session_id(session_id) {
            return Err(SessionLogError::InvalidSessionId);
        }
        Ok(self.dir.join(format!("{session_id}.jsonl")))
    }

    /// Appends `entry` to its session file and returns that file's path.
    pub async fn append(&self, entry: &LogEntry) -> Result<PathBuf, SessionLogError> {
        let path = self.path_for(&entry.session_id)?;
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let io_err = |source| SessionLogError::Io {
            path: path.clone(),
            source,
        };

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(io_err)?;
        file.write_all(line.as_bytes()).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        Ok(path)
    }
}
