use provenance_chat::{build_app, config::AppConfig, init_tracing, run_server, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        host = %config.host,
        port = %config.port,
        "Starting provenance chat backend"
    );

    let state = AppState::from_config(&config).await?;
    let app = build_app(state);

    run_server(app, &config.bind_addr()).await
}
