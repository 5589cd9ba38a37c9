use std::process::ExitCode;

use provenance_chat::config::DeployConfig;
use provenance_chat::init_tracing;
use provenance_chat::provenance::deploy::{run_deploy, EthDeployer};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match DeployConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid deployment configuration");
            return ExitCode::from(1);
        }
    };

    let deployer = match EthDeployer::connect(&config).await {
        Ok(deployer) => deployer,
        Err(err) => {
            tracing::error!(error = %err, "failed to prepare deployment");
            return ExitCode::from(1);
        }
    };

    ExitCode::from(run_deploy(&deployer, &mut std::io::stdout()).await)
}
