//! Sequence classification
//!
//! Trains and serves the message-content classifier: the learned state, its pairing
//! with a vocabulary, on-disk artifacts and the published snapshot.

pub mod artifact;
pub mod model;
pub mod store;

pub use artifact::{ModelArtifact, ModelInfo, TrainedModel, ARTIFACT_FORMAT_VERSION};
pub use model::{ClassifierState, TrainingConfig, TrainingReport};
pub use store::ModelStore;
