use std::sync::Arc;

use async_trait::async_trait;
use ethers::contract::{abigen, FunctionCall};
use ethers::prelude::{Http, LocalWallet, Middleware, Provider, Signer, SignerMiddleware};
use ethers::types::{Address, BlockNumber};
use tokio::sync::Mutex;

use super::{FileHash, LedgerError, RegistryWriter};
use crate::config::LedgerConfig;

const TX_GAS_LIMIT: u64 = 500_000;

abigen!(
    ProvenanceRegistry,
    r#"[
        function registerDataset(string datasetId, bytes32 fileHash, string metadata) external
        function registerModel(string modelVersion, bytes32 fileHash, string datasetId) external
        function commitLog(string sessionId, bytes32 fileHash, string modelVersion) external
    ]"#
);

pub(crate) type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Connects a local signer to `rpc_url`, using the node's chain id.
pub(crate) async fn signer_client(
    rpc_url: &str,
    private_key: &str,
) -> Result<Arc<SignerClient>, LedgerError> {
    let provider = Provider::<Http>::try_from(rpc_url)
        .map_err(|e| LedgerError::InvalidConfig(format!("RPC_URL: {e}")))?;
    let wallet: LocalWallet = private_key
        .trim()
        .parse()
        .map_err(|e| LedgerError::InvalidKey(format!("{e}")))?;
    let chain_id = provider
        .get_chainid()
        .await
        .map_err(|e| LedgerError::Rpc(e.to_string()))?;

    let wallet = wallet.with_chain_id(chain_id.as_u64());
    Ok(Arc::new(SignerMiddleware::new(provider, wallet)))
}

/// [`RegistryWriter`] backed by a deployed `ProvenanceRegistry` contract.
pub struct EthRegistry {
    client: Arc<SignerClient>,
    contract: ProvenanceRegistry<SignerClient>,
    /// Held from the nonce read until the signed transaction is broadcast.
    nonce_lock: Mutex<()>,
}

impl EthRegistry {
    pub async fn connect(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let address: Address = config
            .contract_address
            .trim()
            .parse()
            .map_err(|e| LedgerError::InvalidAddress(format!("{e}")))?;
        let client = signer_client(&config.rpc_url, &config.private_key).await?;
        let contract = ProvenanceRegistry::new(address, client.clone());

        tracing::info!(
            contract = ?address,
            account = ?client.address(),
            "connected to provenance registry"
        );

        Ok(Self {
            client,
            contract,
            nonce_lock: Mutex::new(()),
        })
    }

    /// Sends a legacy-priced transaction and waits for its receipt.
    async fn send(
        &self,
        call: FunctionCall<Arc<SignerClient>, SignerClient, ()>,
    ) -> Result<String, LedgerError> {
        let from = self.client.address();
        let prepared;
        let pending = {
            let _guard = self.nonce_lock.lock().await;
            let nonce = self
                .client
                .get_transaction_count(from, Some(BlockNumber::Pending.into()))
                .await
                .map_err(|e| LedgerError::Rpc(e.to_string()))?;
            let gas_price = self
                .client
                .get_gas_price()
                .await
                .map_err(|e| LedgerError::Rpc(e.to_string()))?;

            prepared = call
                .legacy()
                .from(from)
                .nonce(nonce)
                .gas(TX_GAS_LIMIT)
                .gas_price(gas_price);

            let pending = prepared
                .send()
                .await
                .map_err(|e| LedgerError::Contract(e.to_string()))?;
            tracing::debug!(nonce = %nonce, "broadcast transaction");
            pending
        };

        let receipt = pending
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?
            .ok_or(LedgerError::Dropped)?;

        Ok(format!("0x{}", hex::encode(receipt.transaction_hash.as_bytes())))
    }
}

#[async_trait]
impl RegistryWriter for EthRegistry {
    async fn register_dataset(
        &self,
        dataset_id: &str,
        file_hash: FileHash,
        metadata: &str,
    ) -> Result<String, LedgerError> {
        let call = self.contract.register_dataset(
            dataset_id.to_string(),
            file_hash,
            metadata.to_string(),
        );
        self.send(call).await
    }

    async fn register_model(
        &self,
        model_version: &str,
        file_hash: FileHash,
        dataset_id: &str,
    ) -> Result<String, LedgerError> {
        let call = self.contract.register_model(
            model_version.to_string(),
            file_hash,
            dataset_id.to_string(),
        );
        self.send(call).await
    }

    async fn commit_log(
        &self,
        session_id: &str,
        file_hash: FileHash,
        model_version: &str,
    ) -> Result<String, LedgerError> {
        let call = self.contract.commit_log(
            session_id.to_string(),
            file_hash,
            model_version.to_string(),
        );
        self.send(call).await
    }
}
