//! fraud-core: SMS/URL fraud scoring
//!
//! Classifies text messages and the URLs they reference as fraudulent by combining
//! independent signals into one verdict.
//!
//! # Features
//!
//! - **Vocabulary encoding**: word to index mapping with fixed-length sequences
//! - **Sequence classifier**: trainable spam probability model with versioned artifacts
//! - **Reputation checks**: IPQualityScore-compatible IP and URL lookups
//! - **LLM advisory**: Ollama / OpenAI-compatible prompting with a strict reply parser
//! - **Aggregation**: per-source thresholds, reputation flags override scores
//!
//! # Example Configuration
//!
//! ```toml
//! [model]
//! artifact_path = "models/sms_fraud_model.json"
//! training_data = "data/sms_spam.tsv"
//!
//! [reputation]
//! api_key = "..."   # or FRAUD__REPUTATION__API_KEY
//!
//! [llm]
//! provider = "ollama"
//! model = "mistral:latest"
//! ```
//!
//! # Example
//!
//! ```no_run
//! use fraud_core::{FraudAnalyzer, FraudConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FraudConfig::load(None)?;
//!     let analyzer = FraudAnalyzer::from_config(&config)?;
//!
//!     let analysis = analyzer.analyze("WINNER! Claim your prize at http://x.example").await?;
//!     println!("{}", analysis.explanation);
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod analyzer;
pub mod classifier;
pub mod config;
pub mod dataset;
pub mod error;
pub mod llm;
pub mod logging;
pub mod reputation;
pub mod signal;
pub mod vocab;

pub use aggregator::{AggregationPolicy, FraudAggregator};
pub use analyzer::{extract_ips, extract_urls, Analysis, BatchOutcome, FraudAnalyzer};
pub use classifier::{ModelInfo, ModelStore, TrainedModel, TrainingReport};
pub use config::FraudConfig;
pub use dataset::{Dataset, Label};
pub use error::{FraudError, Result};
pub use signal::{RiskLevel, Signal, SignalSource, Verdict};
pub use vocab::{EncodedSequence, Vocabulary};
