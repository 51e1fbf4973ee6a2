//! Error types for fraud-core

use thiserror::Error;

use crate::signal::SignalSource;

/// Result type alias for fraud-core operations
pub type Result<T> = std::result::Result<T, FraudError>;

/// Fraud pipeline error types
#[derive(Error, Debug)]
pub enum FraudError {
    /// Prediction requested before a classifier state was trained or loaded
    #[error("Classifier has not been trained or loaded")]
    UntrainedModel,

    /// Not enough labelled examples to train
    #[error("Insufficient training data: {found} labelled examples, at least {required} required")]
    InsufficientData { found: usize, required: usize },

    /// One label class has no examples
    #[error("Class imbalance: {spam} spam / {ham} ham examples")]
    ClassImbalance { spam: usize, ham: usize },

    /// Persisted artifact does not match what this build expects
    #[error("Incompatible model artifact: {0}")]
    IncompatibleArtifact(String),

    /// Every signal source came back empty
    #[error("No signal available from any source")]
    NoSignal,

    /// A signal source exceeded its time budget
    #[error("{signal} signal timed out after {timeout_ms} ms")]
    SignalTimeout { signal: SignalSource, timeout_ms: u64 },

    /// Encoded sequence does not have the length the classifier was trained on
    #[error("Sequence length mismatch: expected {expected}, got {found}")]
    SequenceLength { expected: usize, found: usize },

    /// Malformed training data
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Background task failed to complete
    #[error("Task error: {0}")]
    Task(String),
}

impl FraudError {
    /// Errors that only affect a single request, not the process
    pub fn is_request_scoped(&self) -> bool {
        matches!(
            self,
            FraudError::UntrainedModel
                | FraudError::NoSignal
                | FraudError::SequenceLength { .. }
                | FraudError::SignalTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = FraudError::InsufficientData { found: 3, required: 10 };
        assert_eq!(
            err.to_string(),
            "Insufficient training data: 3 labelled examples, at least 10 required"
        );

        let err = FraudError::SignalTimeout {
            signal: SignalSource::LlmAdvisory,
            timeout_ms: 1500,
        };
        assert_eq!(err.to_string(), "llm_advisory signal timed out after 1500 ms");
        assert!(err.is_request_scoped());
        assert!(!FraudError::Config("x".into()).is_request_scoped());
    }
}
