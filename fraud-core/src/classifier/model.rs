//! Sequence classifier
//!
//! Logistic model over the tokens of an encoded sequence and over adjacent token
//! pairs (hashed into a fixed number of buckets), so word order contributes to the
//! score. Weights start at zero and are fitted with seeded SGD, which makes training
//! reproducible for a given corpus and configuration.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ModelConfig;
use crate::dataset::Label;
use crate::error::{FraudError, Result};
use crate::vocab::{EncodedSequence, PAD_INDEX};

/// Training hyper-parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub max_len: usize,
    pub min_examples: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
    pub bigram_buckets: usize,
    pub seed: u64,
    pub strict_class_balance: bool,
}

impl From<&ModelConfig> for TrainingConfig {
    fn from(config: &ModelConfig) -> Self {
        Self {
            max_len: config.max_len,
            min_examples: config.min_examples,
            epochs: config.epochs,
            learning_rate: config.learning_rate,
            l2: config.l2,
            bigram_buckets: config.bigram_buckets,
            seed: config.seed,
            strict_class_balance: config.strict_class_balance,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::from(&ModelConfig::default())
    }
}

/// Summary of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub examples: usize,
    pub spam: usize,
    pub ham: usize,
    pub vocabulary_size: usize,
    pub epochs: usize,
    /// Mean log-loss over the last epoch
    pub final_loss: f64,
    /// Accuracy on the training set at a 0.5 cut-off
    pub training_accuracy: f64,
    /// Non-fatal problems (class imbalance)
    pub warnings: Vec<String>,
}

/// Learned parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierState {
    /// Vocabulary size + 1 (padding)
    pub index_space: usize,
    pub max_len: usize,
    pub bigram_buckets: usize,
    pub bias: f64,
    pub token_weights: Vec<f64>,
    pub bigram_weights: Vec<f64>,
}

/// Sparse feature view of one sequence
struct Features {
    tokens: Vec<usize>,
    bigrams: Vec<usize>,
    scale: f64,
}

impl ClassifierState {
    fn zeroed(index_space: usize, config: &TrainingConfig) -> Self {
        Self {
            index_space,
            max_len: config.max_len,
            bigram_buckets: config.bigram_buckets,
            bias: 0.0,
            token_weights: vec![0.0; index_space],
            bigram_weights: vec![0.0; config.bigram_buckets],
        }
    }

    /// Check internal consistency of loaded parameters
    pub fn validate(&self) -> Result<()> {
        if self.token_weights.len() != self.index_space
            || self.bigram_weights.len() != self.bigram_buckets
            || self.bigram_buckets == 0
            || self.max_len == 0
            || self.index_space == 0
        {
            return Err(FraudError::IncompatibleArtifact(format!(
                "classifier state shape mismatch: {} token weights for index space {}, \
                 {} bigram weights for {} buckets",
                self.token_weights.len(),
                self.index_space,
                self.bigram_weights.len(),
                self.bigram_buckets
            )));
        }
        if !self.bias.is_finite()
            || self.token_weights.iter().chain(&self.bigram_weights).any(|w| !w.is_finite())
        {
            return Err(FraudError::IncompatibleArtifact(
                "classifier state contains non-finite weights".to_string(),
            ));
        }
        Ok(())
    }

    fn features(&self, sequence: &EncodedSequence) -> Features {
        let ids = sequence.as_slice();
        let tokens: Vec<usize> = ids
            .iter()
            .filter(|&&id| id != PAD_INDEX && (id as usize) < self.index_space)
            .map(|&id| id as usize)
            .collect();
        let bigrams: Vec<usize> = ids
            .windows(2)
            .filter(|pair| pair[0] != PAD_INDEX && pair[1] != PAD_INDEX)
            .map(|pair| bigram_bucket(pair[0], pair[1], self.bigram_buckets))
            .collect();

        let count = tokens.len() + bigrams.len();
        let scale = if count > 0 { 1.0 / (count as f64).sqrt() } else { 0.0 };

        Features {
            tokens,
            bigrams,
            scale,
        }
    }

    fn logit(&self, features: &Features) -> f64 {
        let sum: f64 = features
            .tokens
            .iter()
            .map(|&i| self.token_weights[i])
            .chain(features.bigrams.iter().map(|&b| self.bigram_weights[b]))
            .sum();
        self.bias + features.scale * sum
    }

    /// Fraud/spam probability in [0,1]
    pub fn predict(&self, sequence: &EncodedSequence) -> Result<f64> {
        if sequence.len() != self.max_len {
            return Err(FraudError::SequenceLength {
                expected: self.max_len,
                found: sequence.len(),
            });
        }
        Ok(sigmoid(self.logit(&self.features(sequence))))
    }

    /// Fit parameters to labelled sequences
    pub fn train(
        sequences: &[EncodedSequence],
        labels: &[Label],
        index_space: usize,
        config: &TrainingConfig,
    ) -> Result<(Self, TrainingReport)> {
        if index_space == 0 || config.max_len == 0 || config.bigram_buckets == 0 {
            return Err(FraudError::Config(format!(
                "index space ({}), max_len ({}) and bigram_buckets ({}) must be positive",
                index_space, config.max_len, config.bigram_buckets
            )));
        }
        if sequences.len() != labels.len() {
            return Err(FraudError::Dataset(format!(
                "{} sequences but {} labels",
                sequences.len(),
                labels.len()
            )));
        }
        if sequences.len() < config.min_examples.max(1) {
            return Err(FraudError::InsufficientData {
                found: sequences.len(),
                required: config.min_examples.max(1),
            });
        }

        let spam = labels.iter().filter(|&&l| l == Label::Spam).count();
        let ham = labels.len() - spam;
        let mut warnings = Vec::new();
        if spam == 0 || ham == 0 {
            let err = FraudError::ClassImbalance { spam, ham };
            if config.strict_class_balance {
                return Err(err);
            }
            warn!("{}; training continues with a single class", err);
            warnings.push(err.to_string());
        }

        let mut state = Self::zeroed(index_space, config);

        let mut examples = Vec::with_capacity(sequences.len());
        for sequence in sequences {
            if sequence.len() != config.max_len {
                return Err(FraudError::SequenceLength {
                    expected: config.max_len,
                    found: sequence.len(),
                });
            }
            if let Some(id) = sequence.known().find(|&id| id as usize >= index_space) {
                return Err(FraudError::Dataset(format!(
                    "token index {} outside vocabulary of {}",
                    id,
                    index_space.saturating_sub(1)
                )));
            }
            examples.push(state.features(sequence));
        }
        let targets: Vec<f64> = labels.iter().map(Label::target).collect();

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut order: Vec<usize> = (0..examples.len()).collect();
        let mut final_loss = 0.0;

        for epoch in 0..config.epochs {
            order.shuffle(&mut rng);
            let mut loss = 0.0;

            for &i in &order {
                let features = &examples[i];
                let p = sigmoid(state.logit(features));
                loss += log_loss(p, targets[i]);

                let gradient = p - targets[i];
                state.bias -= config.learning_rate * gradient;

                let step = gradient * features.scale;
                for &t in &features.tokens {
                    let w = &mut state.token_weights[t];
                    *w -= config.learning_rate * (step + config.l2 * *w);
                }
                for &b in &features.bigrams {
                    let w = &mut state.bigram_weights[b];
                    *w -= config.learning_rate * (step + config.l2 * *w);
                }
            }

            final_loss = loss / examples.len() as f64;
            debug!(epoch, loss = final_loss, "training epoch complete");
        }

        let correct = examples
            .iter()
            .zip(&targets)
            .filter(|(features, target)| {
                let predicted = sigmoid(state.logit(features)) >= 0.5;
                predicted == (**target >= 0.5)
            })
            .count();
        let training_accuracy = correct as f64 / examples.len() as f64;

        info!(
            examples = examples.len(),
            spam,
            ham,
            loss = final_loss,
            accuracy = training_accuracy,
            "classifier trained"
        );

        let report = TrainingReport {
            examples: examples.len(),
            spam,
            ham,
            vocabulary_size: index_space.saturating_sub(1),
            epochs: config.epochs,
            final_loss,
            training_accuracy,
            warnings,
        };

        Ok((state, report))
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn log_loss(p: f64, target: f64) -> f64 {
    let p = p.clamp(1e-12, 1.0 - 1e-12);
    -(target * p.ln() + (1.0 - target) * (1.0 - p).ln())
}

fn bigram_bucket(a: u32, b: u32, buckets: usize) -> usize {
    let key = (a as u64).wrapping_mul(1_000_003).wrapping_add(b as u64);
    (key % buckets as u64) as usize
}
