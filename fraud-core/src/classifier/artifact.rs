//! Trained model bundle
//!
//! A [`TrainedModel`] pairs a vocabulary with the classifier state fitted against it.
//! On disk it is a versioned JSON [`ModelArtifact`]; loading verifies the format
//! version and the vocabulary fingerprint before anything is served.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use super::model::{ClassifierState, TrainingConfig, TrainingReport};
use crate::config::ModelConfig;
use crate::dataset::Dataset;
use crate::error::{FraudError, Result};
use crate::signal::{Signal, SignalSource};
use crate::vocab::{EncodedSequence, Vocabulary};

/// Bumped whenever the artifact layout or model semantics change
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Serialized bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub vocabulary_fingerprint: String,
    pub vocabulary: Vocabulary,
    pub state: ClassifierState,
}

/// Metadata exposed to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub vocabulary_fingerprint: String,
    pub vocabulary_size: usize,
    pub max_len: usize,
}

/// Vocabulary + classifier state, read-only once built
#[derive(Debug, Clone)]
pub struct TrainedModel {
    vocabulary: Vocabulary,
    state: ClassifierState,
    fingerprint: String,
    created_at: DateTime<Utc>,
}

impl TrainedModel {
    /// Pair a vocabulary with a state, rejecting mismatched shapes
    pub fn new(vocabulary: Vocabulary, state: ClassifierState) -> Result<Self> {
        state.validate()?;
        if state.index_space != vocabulary.index_space() {
            return Err(FraudError::IncompatibleArtifact(format!(
                "classifier trained for {} tokens, vocabulary has {}",
                state.index_space.saturating_sub(1),
                vocabulary.len()
            )));
        }

        Ok(Self {
            fingerprint: vocabulary.fingerprint(),
            vocabulary,
            state,
            created_at: Utc::now(),
        })
    }

    /// Build vocabulary, encode the corpus and fit the classifier
    pub fn train(dataset: &Dataset, config: &ModelConfig) -> Result<(Self, TrainingReport)> {
        let training = TrainingConfig::from(config);
        let vocabulary = Vocabulary::build(dataset.messages(), config.vocabulary_size);

        let sequences: Vec<EncodedSequence> = dataset
            .messages()
            .map(|message| vocabulary.encode(message, config.max_len))
            .collect();

        let (state, report) = ClassifierState::train(
            &sequences,
            &dataset.labels(),
            vocabulary.index_space(),
            &training,
        )?;

        let model = Self::new(vocabulary, state)?;
        info!(
            fingerprint = %model.fingerprint,
            vocabulary = model.vocabulary.len(),
            "model trained"
        );
        Ok((model, report))
    }

    pub fn encode(&self, message: &str) -> EncodedSequence {
        self.vocabulary.encode(message, self.state.max_len)
    }

    pub fn predict(&self, sequence: &EncodedSequence) -> Result<f64> {
        self.state.predict(sequence)
    }

    /// Encode and score a raw message
    pub fn predict_message(&self, message: &str) -> Result<f64> {
        self.predict(&self.encode(message))
    }

    /// Classifier signal for a message
    pub fn signal(&self, message: &str) -> Result<Signal> {
        let probability = self.predict_message(message)?;
        Ok(Signal::scored(
            SignalSource::Classifier,
            probability,
            format!("spam_probability={:.4}", probability),
        ))
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn state(&self) -> &ClassifierState {
        &self.state
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn max_len(&self) -> usize {
        self.state.max_len
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            format_version: ARTIFACT_FORMAT_VERSION,
            created_at: self.created_at,
            vocabulary_fingerprint: self.fingerprint.clone(),
            vocabulary_size: self.vocabulary.len(),
            max_len: self.state.max_len,
        }
    }

    pub fn to_artifact(&self) -> ModelArtifact {
        ModelArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            created_at: self.created_at,
            vocabulary_fingerprint: self.fingerprint.clone(),
            vocabulary: self.vocabulary.clone(),
            state: self.state.clone(),
        }
    }

    /// Validate an artifact and turn it into a servable model
    pub fn from_artifact(
        artifact: ModelArtifact,
        expected_fingerprint: Option<&str>,
    ) -> Result<Self> {
        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(FraudError::IncompatibleArtifact(format!(
                "format version {} (expected {})",
                artifact.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }

        let actual = artifact.vocabulary.fingerprint();
        if actual != artifact.vocabulary_fingerprint {
            return Err(FraudError::IncompatibleArtifact(
                "vocabulary does not match its recorded fingerprint".to_string(),
            ));
        }
        if let Some(expected) = expected_fingerprint {
            if expected != actual {
                return Err(FraudError::IncompatibleArtifact(format!(
                    "vocabulary fingerprint {} does not match expected {}",
                    actual, expected
                )));
            }
        }

        let mut model = Self::new(artifact.vocabulary, artifact.state)?;
        model.created_at = artifact.created_at;
        Ok(model)
    }

    /// Write the artifact atomically (temp file + rename)
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = temp_path(path);
        let json = serde_json::to_vec(&self.to_artifact())?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;

        info!(path = %path.display(), fingerprint = %self.fingerprint, "model artifact published");
        Ok(())
    }

    /// Read and validate an artifact
    pub fn load(path: &Path, expected_fingerprint: Option<&str>) -> Result<Self> {
        let bytes = std::fs::read(path)?;

        // Check the version before the full layout so old bundles fail with a clear error
        let raw: serde_json::Value = serde_json::from_slice(&bytes)?;
        let version = raw
            .get("format_version")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| FraudError::IncompatibleArtifact("missing format_version".to_string()))?;
        if version != ARTIFACT_FORMAT_VERSION as u64 {
            return Err(FraudError::IncompatibleArtifact(format!(
                "format version {} (expected {})",
                version, ARTIFACT_FORMAT_VERSION
            )));
        }

        let artifact: ModelArtifact = serde_json::from_value(raw)
            .map_err(|e| FraudError::IncompatibleArtifact(format!("malformed artifact: {}", e)))?;
        let model = Self::from_artifact(artifact, expected_fingerprint)?;

        info!(path = %path.display(), fingerprint = %model.fingerprint, "model artifact loaded");
        Ok(model)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Label;

    fn dataset() -> Dataset {
        vec![
            (Label::Spam, "win free cash now".to_string()),
            (Label::Spam, "free prize claim now".to_string()),
            (Label::Ham, "let's meet for lunch".to_string()),
            (Label::Ham, "see you at lunch".to_string()),
        ]
        .into_iter()
        .collect()
    }

    fn config() -> ModelConfig {
        ModelConfig {
            max_len: 8,
            min_examples: 2,
            epochs: 20,
            bigram_buckets: 32,
            ..Default::default()
        }
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("model.json");

        let (model, _) = TrainedModel::train(&dataset(), &config()).unwrap();
        model.save(&path).unwrap();
        assert!(!temp_path(&path).exists());

        let loaded = TrainedModel::load(&path, Some(model.fingerprint())).unwrap();
        assert_eq!(loaded.fingerprint(), model.fingerprint());
        assert_eq!(loaded.created_at(), model.created_at());

        for message in ["win free cash", "lunch?", "totally unseen words"] {
            let a = model.predict_message(message).unwrap();
            let b = loaded.predict_message(message).unwrap();
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_load_rejects_wrong_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let (model, _) = TrainedModel::train(&dataset(), &config()).unwrap();
        model.save(&path).unwrap();

        let result = TrainedModel::load(&path, Some("deadbeef"));
        assert!(matches!(result, Err(FraudError::IncompatibleArtifact(_))));
    }

    #[test]
    fn test_load_rejects_other_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let (model, _) = TrainedModel::train(&dataset(), &config()).unwrap();

        let mut value = serde_json::to_value(model.to_artifact()).unwrap();
        value["format_version"] = serde_json::json!(99);
        std::fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();

        let result = TrainedModel::load(&path, None);
        assert!(matches!(result, Err(FraudError::IncompatibleArtifact(_))));
    }

    #[test]
    fn test_mismatched_vocabulary_rejected() {
        let (model, _) = TrainedModel::train(&dataset(), &config()).unwrap();
        let other = Vocabulary::build(["just one"], 10);

        let result = TrainedModel::new(other, model.state().clone());
        assert!(matches!(result, Err(FraudError::IncompatibleArtifact(_))));
    }

    #[test]
    fn test_signal_is_classifier_score() {
        let (model, report) = TrainedModel::train(&dataset(), &config()).unwrap();
        assert_eq!(report.vocabulary_size, model.vocabulary().len());

        let signal = model.signal("win free cash").unwrap();
        assert_eq!(signal.source, SignalSource::Classifier);
        assert!(signal.score.is_some());
        assert!(signal.raw.starts_with("spam_probability="));
    }
}
