//! Configuration for fraud-core
//!
//! Every client receives its section explicitly; nothing reads the environment
//! after [`FraudConfig::load`] returns.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::aggregator::AggregationPolicy;
use crate::error::{FraudError, Result};

/// Environment variable prefix (`FRAUD__REPUTATION__API_KEY`, ...)
pub const ENV_PREFIX: &str = "FRAUD";

/// Main configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FraudConfig {
    /// Vocabulary / classifier / artifact settings
    pub model: ModelConfig,
    /// Aggregation thresholds
    pub policy: AggregationPolicy,
    /// IP/URL reputation service
    pub reputation: ReputationConfig,
    /// LLM advisory service
    pub llm: LlmConfig,
    /// Request orchestration
    pub analyzer: AnalyzerConfig,
    /// HTTP API
    pub server: ServerConfig,
    /// Logging
    pub logging: LoggingConfig,
}

/// Model configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Where the trained artifact is published
    pub artifact_path: Option<PathBuf>,
    /// Labelled dataset used by `train` and bootstrap
    pub training_data: Option<PathBuf>,
    /// Vocabulary cap
    pub vocabulary_size: usize,
    /// Encoded sequence length
    pub max_len: usize,
    /// Minimum labelled examples required to train
    pub min_examples: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    /// L2 penalty applied to weights
    pub l2: f64,
    /// Hash buckets for adjacent token pairs
    pub bigram_buckets: usize,
    /// Seed for example shuffling
    pub seed: u64,
    /// Train on first use when no artifact exists (slow path)
    pub bootstrap_training: bool,
    /// Refuse to train when a class is empty
    pub strict_class_balance: bool,
    /// Reject artifacts whose vocabulary fingerprint differs
    pub expected_fingerprint: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifact_path: Some(PathBuf::from("models/sms_fraud_model.json")),
            training_data: None,
            vocabulary_size: 5000,
            max_len: 100,
            min_examples: 20,
            epochs: 30,
            learning_rate: 0.5,
            l2: 1e-4,
            bigram_buckets: 4096,
            seed: 42,
            bootstrap_training: false,
            strict_class_balance: false,
            expected_fingerprint: None,
        }
    }
}

/// IPQualityScore-compatible reputation service
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReputationConfig {
    /// API root, key and target are appended as path segments
    pub base_url: String,
    /// No key means reputation checks are disabled
    pub api_key: Option<String>,
    /// Scoring strictness (0-3)
    pub strictness: u8,
    /// HTTP timeout in milliseconds
    pub timeout_ms: u64,
    pub allow_public_access_points: bool,
    pub lighter_penalties: bool,
    pub user_agent: String,
    pub user_language: String,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.ipqualityscore.com/api/json".to_string(),
            api_key: None,
            strictness: 0,
            timeout_ms: 5000,
            allow_public_access_points: true,
            lighter_penalties: false,
            user_agent: concat!(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 ",
                "(KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3"
            )
            .to_string(),
            user_language: "en-US".to_string(),
        }
    }
}

impl ReputationConfig {
    pub fn is_enabled(&self) -> bool {
        self.api_key.as_deref().map_or(false, |k| !k.is_empty())
    }
}

/// LLM backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    None,
    Mock,
    Ollama,
    OpenAi,
}

/// LLM advisory configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    /// Overrides the provider's default endpoint
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// HTTP timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::None,
            model: "mistral:latest".to_string(),
            base_url: None,
            api_key: None,
            timeout_ms: 8000,
        }
    }
}

/// Per-request orchestration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Budget for the LLM advisory call
    pub llm_timeout_ms: u64,
    /// Budget for each reputation lookup
    pub reputation_timeout_ms: u64,
    /// Distinct URLs checked per message
    pub max_urls: usize,
    /// Check the hosting IP of a clean URL
    pub follow_url_ip: bool,
    /// Check IP addresses written directly in the message
    pub check_bare_ips: bool,
    /// Treat a parked domain as a URL reputation flag
    pub parked_domain_is_fraud: bool,
    /// Messages of one batch analyzed at the same time
    pub batch_concurrency: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            llm_timeout_ms: 10_000,
            reputation_timeout_ms: 6_000,
            max_urls: 3,
            follow_url_ip: true,
            check_bare_ips: true,
            parked_domain_is_fraud: false,
            batch_concurrency: 8,
        }
    }
}

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Upper bound on messages per batch request
    pub max_batch: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8095".to_string(),
            max_batch: 500,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl FraudConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FraudError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| FraudError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Layer an optional TOML file with `FRAUD__SECTION__KEY` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path).format(config::FileFormat::Toml),
            );
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| FraudError::Config(format!("Failed to load config: {}", e)))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| FraudError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let model = &self.model;
        if model.max_len == 0 {
            return Err(FraudError::Config("model.max_len must be at least 1".to_string()));
        }
        if model.vocabulary_size == 0 {
            return Err(FraudError::Config("model.vocabulary_size must be at least 1".to_string()));
        }
        if model.epochs == 0 || model.learning_rate <= 0.0 {
            return Err(FraudError::Config(
                "model.epochs and model.learning_rate must be positive".to_string(),
            ));
        }
        if model.bigram_buckets == 0 {
            return Err(FraudError::Config(
                "model.bigram_buckets must be at least 1".to_string(),
            ));
        }

        self.policy.validate()?;

        if self.analyzer.llm_timeout_ms == 0 || self.analyzer.reputation_timeout_ms == 0 {
            return Err(FraudError::Config(
                "analyzer timeouts must be greater than zero".to_string(),
            ));
        }
        if self.analyzer.batch_concurrency == 0 {
            return Err(FraudError::Config(
                "analyzer.batch_concurrency must be at least 1".to_string(),
            ));
        }
        if self.reputation.timeout_ms == 0 || self.llm.timeout_ms == 0 {
            return Err(FraudError::Config(
                "client timeouts must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
