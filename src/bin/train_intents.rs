use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use provenance_chat::config::LedgerConfig;
use provenance_chat::init_tracing;
use provenance_chat::intent::{IntentModel, IntentSet};
use provenance_chat::provenance::{EthRegistry, Provenance};

#[derive(Parser, Debug)]
#[command(name = "train_intents", about = "Train the intent classifier from an intents file")]
struct Args {
    #[arg(long, env = "INTENTS_PATH", default_value = "data/intents.json")]
    intents: PathBuf,
    #[arg(long, env = "MODEL_PATH", default_value = "models/intent_model.json")]
    output: PathBuf,
    #[arg(long, help = "Register the dataset and the trained model with the provenance registry")]
    register: bool,
    #[arg(long, default_value = "", help = "Metadata stored with the dataset record")]
    metadata: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let args = Args::parse();

    let set = IntentSet::load(&args.intents)?;
    let model = IntentModel::train(&set)?;
    model.save(&args.output)?;
    println!("Training complete. Model saved to {}", args.output.display());

    if args.register {
        let ledger = LedgerConfig::from_env()
            .context("--register needs RPC_URL, CONTRACT_ADDRESS and PRIVATE_KEY")?;
        let registry = EthRegistry::connect(&ledger).await?;
        let provenance = Provenance::new(Arc::new(registry));

        let dataset_tx = provenance
            .register_dataset(&model.dataset_id, &args.intents, &args.metadata)
            .await
            .context("register dataset")?;
        println!("Dataset {} registered: {dataset_tx}", model.dataset_id);

        let model_tx = provenance
            .register_model(&model.model_version, &args.output, &model.dataset_id)
            .await
            .context("register model")?;
        println!("Model {} registered: {model_tx}", model.model_version);
    }

    Ok(())
}
