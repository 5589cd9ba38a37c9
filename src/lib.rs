pub mod api;
pub mod client;
pub mod config;
pub mod intent;
pub mod provenance;
pub mod session_log;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::AppConfig;
use intent::IntentModel;
use provenance::{EthRegistry, Provenance};
use session_log::SessionLog;

#[derive(Clone)]
pub struct AppState {
    pub model: Arc<IntentModel>,
    pub session_log: Arc<SessionLog>,
    /// `None` when no ledger is configured; replies then carry no log tx hash.
    pub provenance: Option<Provenance>,
}

impl AppState {
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let model = IntentModel::load_or_train(&config.model_path, &config.intents_path)
            .context("load intent model")?;
        let session_log = SessionLog::open(&config.log_dir)
            .await
            .context("open session log directory")?;

        let provenance = match &config.ledger {
            Some(ledger) => match EthRegistry::connect(ledger).await {
                Ok(registry) => Some(Provenance::new(Arc::new(registry))),
                Err(err) => {
                    tracing::warn!(error = %err, "provenance registry unavailable, logs will not be committed");
                    None
                }
            },
            None => {
                tracing::warn!("RPC_URL, CONTRACT_ADDRESS or PRIVATE_KEY not set - running without provenance registry");
                None
            }
        };

        tracing::info!(
            model_version = %model.model_version,
            dataset_id = %model.dataset_id,
            log_dir = %session_log.dir().display(),
            "application state ready"
        );

        Ok(Self {
            model: Arc::new(model),
            session_log: Arc::new(session_log),
            provenance,
        })
    }
}

pub fn build_app(state: AppState) -> Router {
    api::router(state)
}

pub async fn run_server(app: Router, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app).await.context("server failed")?;
    Ok(())
}

/// Logs go to stderr so the chat REPL and the deploy report keep stdout.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,provenance_chat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
