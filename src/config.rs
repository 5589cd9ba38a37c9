use std::env;
use std::path::PathBuf;

pub const DEFAULT_CHAT_URL: &str = "http://localhost:5000/chat";
pub const DEFAULT_ARTIFACT_PATH: &str =
    "blockchain/artifacts/contracts/ProvenanceRegistry.sol/ProvenanceRegistry.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid value for: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub intents_path: PathBuf,
    pub model_path: PathBuf,
    pub log_dir: PathBuf,
    pub ledger: Option<LedgerConfig>,
}

/// Connection details for the on-chain `ProvenanceRegistry`.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub rpc_url: String,
    pub contract_address: String,
    pub private_key: String,
}

#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub rpc_url: String,
    pub private_key: String,
    pub artifact_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub chat_url: String,
    pub timeout_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 5000)?,
            intents_path: path_var("INTENTS_PATH", "data/intents.json"),
            model_path: path_var("MODEL_PATH", "models/intent_model.json"),
            log_dir: path_var("LOG_DIR", "logs"),
            ledger: LedgerConfig::from_env(),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl LedgerConfig {
    /// Returns `None` unless every ledger variable is set.
    pub fn from_env() -> Option<Self> {
        Some(Self {
            rpc_url: non_empty_var("RPC_URL")?,
            contract_address: non_empty_var("CONTRACT_ADDRESS")?,
            private_key: non_empty_var("PRIVATE_KEY")?,
        })
    }
}

impl DeployConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            rpc_url: non_empty_var("RPC_URL").ok_or(ConfigError::Missing("RPC_URL"))?,
            private_key: non_empty_var("PRIVATE_KEY").ok_or(ConfigError::Missing("PRIVATE_KEY"))?,
            artifact_path: path_var("ARTIFACT_PATH", DEFAULT_ARTIFACT_PATH),
        })
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            chat_url: env::var("CHAT_URL").unwrap_or_else(|_| DEFAULT_CHAT_URL.to_string()),
            timeout_ms: parse_var("CHAT_TIMEOUT_MS", 20_000)?,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn path_var(name: &str, default: &str) -> PathBuf {
    non_empty_var(name)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}
