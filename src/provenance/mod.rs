//! Provenance records for datasets, models and chat session logs.
//!
//! Files are identified by their SHA-256 digest; the digest is written to the
//! `ProvenanceRegistry` contract together with the record's identifiers.

pub mod deploy;
mod registry;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

pub use registry::EthRegistry;

const HASH_CHUNK_SIZE: usize = 8192;

pub type FileHash = [u8; 32];

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("failed to hash {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid ledger configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid private key: {0}")]
    InvalidKey(String),
    #[error("invalid contract address: {0}")]
    InvalidAddress(String),
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("contract call failed: {0}")]
    Contract(String),
    #[error("transaction dropped before it was mined")]
    Dropped,
}

/// Writes digests to the registry contract. Each call returns the hash of the
/// mined transaction.
#[async_trait]
pub trait RegistryWriter: Send + Sync {
    async fn register_dataset(
        &self,
        dataset_id: &str,
        file_hash: FileHash,
        metadata: &str,
    ) -> Result<String, LedgerError>;

    async fn register_model(
        &self,
        model_version: &str,
        file_hash: FileHash,
        dataset_id: &str,
    ) -> Result<String, LedgerError>;

    async fn commit_log(
        &self,
        session_id: &str,
        file_hash: FileHash,
        model_version: &str,
    ) -> Result<String, LedgerError>;
}

/// SHA-256 of a file's contents.
pub async fn hash_file(path: &Path) -> Result<FileHash, LedgerError> {
    let io_err = |source| LedgerError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = tokio::fs::File::open(path).await.map_err(io_err)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let read = file.read(&mut buf).await.map_err(io_err)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hasher.finalize().into())
}

/// File-level provenance operations on top of a [`RegistryWriter`].
#[derive(Clone)]
pub struct Provenance {
    writer: Arc<dyn RegistryWriter>,
}

impl Provenance {
    pub fn new(writer: Arc<dyn RegistryWriter>) -> Self {
        Self { writer }
    }

    pub async fn register_dataset(
        &self,
        dataset_id: &str,
        data_path: &Path,
        metadata: &str,
    ) -> Result<String, LedgerError> {
        let file_hash = hash_file(data_path).await?;
        self.writer
            .register_dataset(dataset_id, file_hash, metadata)
            .await
    }

    pub async fn register_model(
        &self,
        model_version: &str,
        model_path: &Path,
        dataset_id: &str,
    ) -> Result<String, LedgerError> {
        let file_hash = hash_file(model_path).await?;
        self.writer
            .register_model(model_version, file_hash, dataset_id)
            .await
    }

    /// Commits the current digest of a session log. `Ok(None)` when the log
    /// does not exist.
    pub async fn commit_log(
        &self,
        session_id: &str,
        log_path: &Path,
        model_version: &str,
    ) -> Result<Option<String>, LedgerError> {
        if !tokio::fs::try_exists(log_path).await.unwrap_or(false) {
            return Ok(None);
        }
        let file_hash = hash_file(log_path).await?;
        let tx_hash = self
            .writer
            .commit_log(session_id, file_hash, model_version)
            .await?;
        tracing::info!(session_id, tx_hash = %tx_hash, "committed session log");
        Ok(Some(tx_hash))
    }
}
