use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use ethers::abi::Abi;
use ethers::contract::ContractFactory;
use ethers::types::{Address, Bytes};
use ethers::utils::to_checksum;
use serde::Deserialize;

use super::registry::{signer_client, SignerClient};
use super::LedgerError;
use crate::config::DeployConfig;

pub const CONTRACT_NAME: &str = "ProvenanceRegistry";

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("failed to read artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid artifact {}: {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("artifact has no deployable bytecode")]
    EmptyBytecode,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("deployment failed: {0}")]
    Contract(String),
}

/// The parts of a compiled contract artifact needed to deploy it.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractArtifact {
    #[serde(rename = "contractName", default)]
    pub contract_name: String,
    pub abi: Abi,
    pub bytecode: Bytes,
}

impl ContractArtifact {
    pub fn load(path: &Path) -> Result<Self, DeployError> {
        let data = std::fs::read_to_string(path).map_err(|source| DeployError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: Self = serde_json::from_str(&data).map_err(|source| DeployError::Artifact {
            path: path.to_path_buf(),
            source,
        })?;
        if artifact.bytecode.is_empty() {
            return Err(DeployError::EmptyBytecode);
        }
        Ok(artifact)
    }
}

#[async_trait]
pub trait RegistryDeployer: Send + Sync {
    /// Deploys the registry and returns its address once the deployment is mined.
    async fn deploy(&self) -> Result<Address, DeployError>;
}

pub struct EthDeployer {
    client: Arc<SignerClient>,
    artifact: ContractArtifact,
}

impl EthDeployer {
    pub async fn connect(config: &DeployConfig) -> Result<Self, DeployError> {
        let artifact = ContractArtifact::load(&config.artifact_path)?;
        let client = signer_client(&config.rpc_url, &config.private_key).await?;
        Ok(Self { client, artifact })
    }
}

#[async_trait]
impl RegistryDeployer for EthDeployer {
    async fn deploy(&self) -> Result<Address, DeployError> {
        let factory = ContractFactory::new(
            self.artifact.abi.clone(),
            self.artifact.bytecode.clone(),
            self.client.clone(),
        );
        let contract = factory
            .deploy(())
            .map_err(|e| DeployError::Contract(e.to_string()))?
            .send()
            .await
            .map_err(|e| DeployError::Contract(e.to_string()))?;
        Ok(contract.address())
    }
}

/// Runs one deployment and reports it on `out`. Returns the process exit
/// code: 0 on success, 1 on any error.
pub async fn run_deploy<D, W>(deployer: &D, out: &mut W) -> u8
where
    D: RegistryDeployer + ?Sized,
    W: Write,
{
    match deployer.deploy().await {
        Ok(address) => {
            let line = format!("{CONTRACT_NAME} deployed to: {}", to_checksum(&address, None));
            match writeln!(out, "{line}") {
                Ok(()) => 0,
                Err(err) => {
                    tracing::error!(error = %err, "failed to report deployed address");
                    1
                }
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "deployment failed");
            1
        }
    }
}
