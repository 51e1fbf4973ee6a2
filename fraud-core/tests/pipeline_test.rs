//! End-to-end tests for encoding, training, persistence and aggregation

use fraud_core::config::ModelConfig;
use fraud_core::{
    Dataset, FraudAggregator, FraudError, Signal, SignalSource, TrainedModel, Vocabulary,
};

const SMS_DATA: &str = "label\tmessage
spam\tWINNER!! You have won a free cash prize, call now to claim
spam\tFree entry in a weekly competition to win cup final tickets
spam\tURGENT: your account is suspended, verify your details now
spam\tClaim your free gift card, reply WIN to this number
spam\tCongratulations you won a free holiday, claim now
spam\tYour bank account is locked, click the link to verify now
ham\tAre we still meeting for lunch today?
ham\tI'll be home late, can you feed the cat
ham\tSee you at the station at six
ham\tThanks for dinner last night, it was lovely
ham\tCan you send me the notes from the lecture
ham\tRunning late, save me a seat please
";

fn model_config() -> ModelConfig {
    ModelConfig {
        artifact_path: None,
        max_len: 20,
        min_examples: 4,
        epochs: 40,
        bigram_buckets: 128,
        ..Default::default()
    }
}

#[test]
fn test_encoding_scenario() {
    let vocabulary = Vocabulary::build(["win free cash now", "let's meet for lunch"], 10);
    let sequence = vocabulary.encode("win free cash", 5);

    assert_eq!(sequence.len(), 5);
    assert!(sequence.non_zero_count() <= 3);
    assert_eq!(sequence.as_slice(), &[1, 2, 3, 0, 0]);
}

#[test]
fn test_train_persist_reload() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("sms.tsv");
    let artifact_path = dir.path().join("model.json");
    std::fs::write(&data_path, SMS_DATA).unwrap();

    let dataset = Dataset::from_path(&data_path).unwrap();
    assert_eq!(dataset.counts(), (6, 6));

    let (model, report) = TrainedModel::train(&dataset, &model_config()).unwrap();
    assert_eq!(report.examples, 12);
    assert!(report.warnings.is_empty());

    let spam = model
        .predict_message("Claim your free cash prize now")
        .unwrap();
    let ham = model
        .predict_message("Are we still meeting for lunch today?")
        .unwrap();
    assert!(spam > ham, "spam={} ham={}", spam, ham);

    model.save(&artifact_path).unwrap();
    let reloaded = TrainedModel::load(&artifact_path, None).unwrap();
    assert_eq!(reloaded.fingerprint(), model.fingerprint());

    for message in ["Claim your free cash prize now", "see you at six", "zzz unknown words"] {
        let before = model.predict_message(message).unwrap();
        let after = reloaded.predict_message(message).unwrap();
        assert!((before - after).abs() < 1e-9);
    }
}

#[test]
fn test_insufficient_data_rejected() {
    let dataset = Dataset::parse("spam\twin now\nham\thello\n").unwrap();
    let result = TrainedModel::train(&dataset, &model_config());
    assert!(matches!(
        result,
        Err(FraudError::InsufficientData { found: 2, required: 4 })
    ));
}

#[test]
fn test_unusable_model_shape_rejected() {
    let dataset = Dataset::parse(SMS_DATA).unwrap();
    for config in [
        ModelConfig {
            bigram_buckets: 0,
            ..model_config()
        },
        ModelConfig {
            max_len: 0,
            ..model_config()
        },
    ] {
        let result = TrainedModel::train(&dataset, &config);
        assert!(matches!(result, Err(FraudError::Config(_))));
    }
}

#[test]
fn test_aggregation_scenarios() {
    let aggregator = FraudAggregator::default();

    // Classifier alone
    let verdict = aggregator
        .aggregate(&[Signal::scored(SignalSource::Classifier, 0.9, "p=0.9")])
        .unwrap();
    assert!(verdict.is_fraud);
    assert!((verdict.confidence - 0.9).abs() < 1e-9);

    // Reputation overrides a clean classifier score
    let verdict = aggregator
        .aggregate(&[
            Signal::scored(SignalSource::Classifier, 0.1, "p=0.1"),
            Signal::new(SignalSource::UrlReputation, Some(0.8), None, "risk_score=80"),
        ])
        .unwrap();
    assert!(verdict.is_fraud);
    assert!((verdict.confidence - 0.8).abs() < 1e-9);

    // Every source absent
    let result = aggregator.aggregate(&[
        Signal::absent(SignalSource::Classifier, "unavailable"),
        Signal::absent(SignalSource::UrlReputation, "success=false"),
        Signal::absent(SignalSource::LlmAdvisory, "timed out"),
    ]);
    assert!(matches!(result, Err(FraudError::NoSignal)));
}
