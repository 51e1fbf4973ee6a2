//! CLI tool for training and inspecting the fraud model
//!
//! # Usage
//!
//! ```bash
//! # Train from a labelled dataset and publish the artifact
//! fraud-model train --data data/sms_spam.tsv --out models/sms_fraud_model.json
//!
//! # Classifier probability only
//! fraud-model predict "WINNER! Claim your free prize now"
//!
//! # Full pipeline (classifier + reputation + LLM, as configured)
//! fraud-model --config fraud.toml analyze "Your account is locked: http://x.example"
//!
//! # Artifact metadata
//! fraud-model inspect
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use fraud_core::{Dataset, FraudAnalyzer, FraudConfig, FraudError, ModelStore, TrainedModel};

#[derive(Parser)]
#[command(name = "fraud-model")]
#[command(about = "Train, inspect and query the SMS fraud model", long_about = None)]
struct Cli {
    /// Configuration file (TOML); FRAUD__SECTION__KEY variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the classifier and publish the artifact
    Train {
        /// Labelled dataset (label<TAB>message or label,message)
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Artifact destination
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print the classifier's spam probability for a message
    Predict {
        message: String,
    },
    /// Run the full analysis pipeline on a message
    Analyze {
        message: String,
    },
    /// Show metadata of a published artifact
    Inspect {
        /// Artifact path (defaults to model.artifact_path)
        #[arg(short, long)]
        artifact: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        FraudConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    fraud_core::logging::init(&config.logging);

    match cli.command {
        Commands::Train { data, out } => {
            if let Some(data) = data {
                config.model.training_data = Some(data);
            }
            if let Some(out) = out {
                config.model.artifact_path = Some(out);
            }
            let data = config
                .model
                .training_data
                .clone()
                .context("No dataset given (--data or model.training_data)")?;

            let dataset = Dataset::from_path(&data)?;
            let (spam, ham) = dataset.counts();
            info!("📚 Loaded {} examples ({} spam / {} ham)", dataset.len(), spam, ham);

            let store = ModelStore::new(config.model.clone());
            let report = store.retrain(dataset).await?;

            for warning in &report.warnings {
                eprintln!("⚠ {}", warning);
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
            if let Some(path) = &config.model.artifact_path {
                println!("✓ Model published to {}", path.display());
            }
        }
        Commands::Predict { message } => {
            let store = ModelStore::new(config.model.clone());
            let model = store.snapshot().await?;

            let sequence = model.encode(&message);
            let probability = model.predict(&sequence)?;
            println!(
                "spam probability: {:.4} ({} of {} tokens known)",
                probability,
                sequence.non_zero_count(),
                sequence.len()
            );
        }
        Commands::Analyze { message } => {
            let analyzer = FraudAnalyzer::from_config(&config)?;

            match analyzer.analyze(&message).await {
                Ok(analysis) => println!("{}", serde_json::to_string_pretty(&analysis)?),
                Err(FraudError::NoSignal) => {
                    println!("unknown: no signal source produced a result");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Inspect { artifact } => {
            let path = artifact
                .or_else(|| config.model.artifact_path.clone())
                .context("No artifact path (--artifact or model.artifact_path)")?;

            let model = TrainedModel::load(&path, config.model.expected_fingerprint.as_deref())
                .with_context(|| format!("Failed to load {}", path.display()))?;
            println!("{}", serde_json::to_string_pretty(&model.info())?);
        }
    }

    Ok(())
}
