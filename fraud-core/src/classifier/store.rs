//! Published model snapshot
//!
//! Readers get an `Arc<TrainedModel>` and never observe a model mid-training.
//! Training runs on a blocking thread under the training lock only; the published
//! slot is write-locked just long enough to swap the new model in.

use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use super::artifact::TrainedModel;
use super::model::TrainingReport;
use crate::config::ModelConfig;
use crate::dataset::Dataset;
use crate::error::{FraudError, Result};

/// Lazily loaded, atomically replaced model
pub struct ModelStore {
    config: ModelConfig,
    current: RwLock<Option<Arc<TrainedModel>>>,
    /// Held for the whole of a training run; always taken before `current`
    training: Mutex<()>,
}

impl ModelStore {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            current: RwLock::new(None),
            training: Mutex::new(()),
        }
    }

    /// Store serving an already built model
    pub fn with_model(config: ModelConfig, model: TrainedModel) -> Self {
        Self {
            config,
            current: RwLock::new(Some(Arc::new(model))),
            training: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Currently published model, without triggering a load
    pub async fn current(&self) -> Option<Arc<TrainedModel>> {
        self.current.read().await.clone()
    }

    pub async fn is_loaded(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Published model, loading the artifact on first use.
    ///
    /// Without an artifact this fails with [`FraudError::UntrainedModel`] unless
    /// `bootstrap_training` is enabled, in which case the model is trained inline.
    pub async fn snapshot(&self) -> Result<Arc<TrainedModel>> {
        if let Some(model) = self.current.read().await.as_ref() {
            return Ok(Arc::clone(model));
        }

        let _training = self.training.lock().await;
        // Every writer holds the training lock, so nothing is published behind us
        if let Some(model) = self.current.read().await.as_ref() {
            return Ok(Arc::clone(model));
        }

        let model = match self.load_artifact().await? {
            Some(model) => model,
            None if self.config.bootstrap_training => {
                warn!("no model artifact found; bootstrap training on the request path");
                let dataset = self.training_dataset().await?;
                let (model, report) = self.train_blocking(dataset).await?;
                info!(
                    examples = report.examples,
                    accuracy = report.training_accuracy,
                    "bootstrap training finished"
                );
                self.save_blocking(&model).await?;
                model
            }
            None => return Err(FraudError::UntrainedModel),
        };

        let model = Arc::new(model);
        *self.current.write().await = Some(Arc::clone(&model));
        Ok(model)
    }

    /// Train on `dataset` and publish the result
    pub async fn retrain(&self, dataset: Dataset) -> Result<TrainingReport> {
        let _training = self.training.lock().await;

        let (model, report) = self.train_blocking(dataset).await?;
        self.save_blocking(&model).await?;
        *self.current.write().await = Some(Arc::new(model));

        Ok(report)
    }

    /// Train on the configured dataset and publish the result
    pub async fn retrain_from_config(&self) -> Result<TrainingReport> {
        let dataset = self.training_dataset().await?;
        self.retrain(dataset).await
    }

    /// Publish an externally built model
    pub async fn publish(&self, model: TrainedModel) -> Result<()> {
        let _training = self.training.lock().await;
        self.save_blocking(&model).await?;
        *self.current.write().await = Some(Arc::new(model));
        Ok(())
    }

    /// Drop the published model and read the artifact again
    pub async fn reload(&self) -> Result<Arc<TrainedModel>> {
        let _training = self.training.lock().await;
        let model = self
            .load_artifact()
            .await?
            .map(Arc::new)
            .ok_or(FraudError::UntrainedModel)?;
        *self.current.write().await = Some(Arc::clone(&model));
        Ok(model)
    }

    async fn load_artifact(&self) -> Result<Option<TrainedModel>> {
        let Some(path) = self.config.artifact_path.clone() else {
            return Ok(None);
        };
        if !path.exists() {
            info!(path = %path.display(), "no model artifact present");
            return Ok(None);
        }

        let expected = self.config.expected_fingerprint.clone();
        let model =
            tokio::task::spawn_blocking(move || TrainedModel::load(&path, expected.as_deref()))
                .await
                .map_err(|e| FraudError::Task(e.to_string()))??;
        Ok(Some(model))
    }

    async fn training_dataset(&self) -> Result<Dataset> {
        let path = self.config.training_data.clone().ok_or_else(|| {
            FraudError::Config("model.training_data is not set".to_string())
        })?;

        tokio::task::spawn_blocking(move || Dataset::from_path(Path::new(&path)))
            .await
            .map_err(|e| FraudError::Task(e.to_string()))?
    }

    async fn train_blocking(&self, dataset: Dataset) -> Result<(TrainedModel, TrainingReport)> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || TrainedModel::train(&dataset, &config))
            .await
            .map_err(|e| FraudError::Task(e.to_string()))?
    }

    async fn save_blocking(&self, model: &TrainedModel) -> Result<()> {
        let Some(path) = self.config.artifact_path.clone() else {
            return Ok(());
        };
        let model = model.clone();
        tokio::task::spawn_blocking(move || model.save(&path))
            .await
            .map_err(|e| FraudError::Task(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Label;
    use std::time::Duration;

    const DATA: &str = "spam\twin free cash now
spam\tclaim your free prize
ham\tlet's meet for lunch
ham\tsee you at lunch
";

    fn config(dir: &Path) -> ModelConfig {
        ModelConfig {
            artifact_path: Some(dir.join("model.json")),
            training_data: Some(dir.join("sms.tsv")),
            max_len: 8,
            min_examples: 2,
            epochs: 15,
            bigram_buckets: 32,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_snapshot_without_artifact_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(config(dir.path()));

        assert!(matches!(store.snapshot().await, Err(FraudError::UntrainedModel)));
        assert!(!store.is_loaded().await);
    }

    #[tokio::test]
    async fn test_bootstrap_training_publishes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sms.tsv"), DATA).unwrap();

        let store = ModelStore::new(ModelConfig {
            bootstrap_training: true,
            ..config(dir.path())
        });

        let model = store.snapshot().await.unwrap();
        assert!(dir.path().join("model.json").exists());

        // Second call serves the same snapshot
        let again = store.snapshot().await.unwrap();
        assert!(Arc::ptr_eq(&model, &again));

        // A fresh store loads the published artifact
        let fresh = ModelStore::new(config(dir.path()));
        let loaded = fresh.snapshot().await.unwrap();
        assert_eq!(loaded.fingerprint(), model.fingerprint());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_is_loaded_answers_during_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sms.tsv"), DATA).unwrap();

        let store = Arc::new(ModelStore::new(ModelConfig {
            bootstrap_training: true,
            epochs: 100_000,
            ..config(dir.path())
        }));

        let loading = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.snapshot().await }
        });

        while !loading.is_finished() {
            let loaded = tokio::time::timeout(Duration::from_millis(50), store.is_loaded()).await;
            assert!(loaded.is_ok(), "is_loaded blocked behind training");
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        assert!(loading.await.unwrap().is_ok());
        assert!(store.is_loaded().await);
    }

    #[tokio::test]
    async fn test_retrain_swaps_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(config(dir.path()));

        let dataset = Dataset::parse(DATA).unwrap();
        let report = store.retrain(dataset).await.unwrap();
        assert_eq!(report.examples, 4);
        let first = store.snapshot().await.unwrap();

        let bigger: Dataset = vec![
            (Label::Spam, "urgent account locked verify now".to_string()),
            (Label::Spam, "free cash prize".to_string()),
            (Label::Ham, "dinner at eight".to_string()),
        ]
        .into_iter()
        .collect();
        store.retrain(bigger).await.unwrap();
        let second = store.snapshot().await.unwrap();

        assert_ne!(first.fingerprint(), second.fingerprint());
        // Readers holding the old snapshot keep a consistent model
        assert!(first.predict_message("free cash").is_ok());
    }

    #[tokio::test]
    async fn test_missing_training_data_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(ModelConfig {
            training_data: None,
            bootstrap_training: true,
            ..config(dir.path())
        });

        assert!(matches!(store.snapshot().await, Err(FraudError::Config(_))));
    }
}
