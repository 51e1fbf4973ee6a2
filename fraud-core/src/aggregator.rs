//! Fraud aggregator
//!
//! Folds independent signals into one verdict. Any single fraud vote is enough to
//! mark the message fraudulent: a missed fraud costs more than a false alarm, so a
//! legitimate-looking classifier score never cancels a positive reputation result.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FraudError, Result};
use crate::signal::{Signal, SignalSource, Verdict};

/// Per-source thresholds and defaults
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AggregationPolicy {
    /// Classifier probability at or above which the message is fraud
    pub classifier_threshold: f64,
    /// Normalized IP fraud score threshold (60/100)
    pub ip_reputation_threshold: f64,
    /// Normalized URL risk score threshold (60/100)
    pub url_reputation_threshold: f64,
    /// Normalized LLM percentage threshold
    pub llm_threshold: f64,
    /// Confidence floor for a vote carried by a categorical flag
    pub flag_confidence: f64,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self {
            classifier_threshold: 0.5,
            ip_reputation_threshold: 0.6,
            url_reputation_threshold: 0.6,
            llm_threshold: 0.5,
            flag_confidence: 0.85,
        }
    }
}

impl AggregationPolicy {
    pub fn threshold(&self, source: SignalSource) -> f64 {
        match source {
            SignalSource::Classifier => self.classifier_threshold,
            SignalSource::IpReputation => self.ip_reputation_threshold,
            SignalSource::UrlReputation => self.url_reputation_threshold,
            SignalSource::LlmAdvisory => self.llm_threshold,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let values = [
            ("classifier_threshold", self.classifier_threshold),
            ("ip_reputation_threshold", self.ip_reputation_threshold),
            ("url_reputation_threshold", self.url_reputation_threshold),
            ("llm_threshold", self.llm_threshold),
            ("flag_confidence", self.flag_confidence),
        ];

        for (name, value) in values {
            if !(0.0..=1.0).contains(&value) {
                return Err(FraudError::Config(format!(
                    "policy.{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

/// Direction and strength of one signal's opinion
#[derive(Debug, Clone, Copy, PartialEq)]
enum Vote {
    Fraud(f64),
    Legitimate(f64),
}

/// Signal fusion
#[derive(Debug, Clone, Default)]
pub struct FraudAggregator {
    policy: AggregationPolicy,
}

impl FraudAggregator {
    pub fn new(policy: AggregationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AggregationPolicy {
        &self.policy
    }

    /// Combine signals into a verdict.
    ///
    /// Fails with [`FraudError::NoSignal`] when every signal is absent.
    pub fn aggregate(&self, signals: &[Signal]) -> Result<Verdict> {
        let mut fraud_confidence: Option<f64> = None;
        let mut legit_confidence: Option<f64> = None;
        let mut contributing = Vec::with_capacity(signals.len());

        for signal in signals {
            let Some(vote) = self.vote(signal) else {
                debug!(source = %signal.source, raw = %signal.raw, "absent signal ignored");
                continue;
            };

            match vote {
                Vote::Fraud(strength) => {
                    fraud_confidence = Some(fraud_confidence.map_or(strength, |c| c.max(strength)));
                }
                Vote::Legitimate(strength) => {
                    legit_confidence = Some(legit_confidence.map_or(strength, |c| c.max(strength)));
                }
            }
            contributing.push(signal.clone());
        }

        let (is_fraud, confidence) = match (fraud_confidence, legit_confidence) {
            (Some(confidence), _) => (true, confidence),
            (None, Some(confidence)) => (false, confidence),
            (None, None) => return Err(FraudError::NoSignal),
        };

        debug!(
            is_fraud,
            confidence,
            signals = contributing.len(),
            "signals aggregated"
        );

        Ok(Verdict {
            is_fraud,
            confidence: confidence.clamp(0.0, 1.0),
            contributing_signals: contributing,
        })
    }

    /// Reputation flags override scores: a true flag is a fraud vote with
    /// confidence `max(score, flag_confidence)`, so a flagged signal is lifted to
    /// `flag_confidence` even when it carries a lower numeric score. For other
    /// sources the score decides and a flag only counts when no score was given,
    /// at `flag_confidence`. Scores are compared against the source threshold and
    /// legitimate votes are weighted by `1 - score`.
    fn vote(&self, signal: &Signal) -> Option<Vote> {
        let score = signal.normalized_score();

        if signal.source.is_reputation() && signal.flag == Some(true) {
            let strength = score.map_or(self.policy.flag_confidence, |s| {
                s.max(self.policy.flag_confidence)
            });
            return Some(Vote::Fraud(strength));
        }

        match (score, signal.flag) {
            (Some(score), _) if score >= self.policy.threshold(signal.source) => {
                Some(Vote::Fraud(score))
            }
            (Some(score), _) => Some(Vote::Legitimate(1.0 - score)),
            (None, Some(true)) => Some(Vote::Fraud(self.policy.flag_confidence)),
            (None, Some(false)) => Some(Vote::Legitimate(self.policy.flag_confidence)),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregator() -> FraudAggregator {
        FraudAggregator::default()
    }

    #[test]
    fn test_classifier_only() {
        let verdict = aggregator()
            .aggregate(&[Signal::scored(SignalSource::Classifier, 0.9, "p=0.9")])
            .unwrap();
        assert!(verdict.is_fraud);
        assert!((verdict.confidence - 0.9).abs() < 1e-9);
        assert_eq!(verdict.contributing_signals.len(), 1);
    }

    #[test]
    fn test_reputation_overrides_classifier() {
        let signals = vec![
            Signal::scored(SignalSource::Classifier, 0.1, "p=0.1"),
            Signal::new(SignalSource::UrlReputation, Some(0.8), Some(false), "risk_score=80"),
        ];
        let verdict = aggregator().aggregate(&signals).unwrap();
        assert!(verdict.is_fraud);
        assert!((verdict.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_flag_forces_fraud() {
        let signals = vec![
            Signal::scored(SignalSource::Classifier, 0.0, "p=0.0"),
            Signal::flagged(SignalSource::IpReputation, true, "proxy=true"),
        ];
        let verdict = aggregator().aggregate(&signals).unwrap();
        assert!(verdict.is_fraud);
        assert_eq!(verdict.confidence, 0.85);
    }

    #[test]
    fn test_flag_with_low_score_uses_floor() {
        let signals = vec![Signal::new(
            SignalSource::UrlReputation,
            Some(0.2),
            Some(true),
            "phishing=true risk_score=20",
        )];
        let verdict = aggregator().aggregate(&signals).unwrap();
        assert!(verdict.is_fraud);
        assert_eq!(verdict.confidence, 0.85);
    }

    #[test]
    fn test_advisory_flag_does_not_override_score() {
        let signals = vec![Signal::new(SignalSource::LlmAdvisory, Some(0.2), Some(true), "")];
        let verdict = aggregator().aggregate(&signals).unwrap();
        assert!(!verdict.is_fraud);
        assert!((verdict.confidence - 0.8).abs() < 1e-9);

        let signals = vec![
            Signal::scored(SignalSource::Classifier, 0.1, "p=0.1"),
            Signal::flagged(SignalSource::LlmAdvisory, true, "reply=\"Fraud\""),
        ];
        let verdict = aggregator().aggregate(&signals).unwrap();
        assert!(verdict.is_fraud);
        assert_eq!(verdict.confidence, 0.85);
    }

    #[test]
    fn test_legitimate_confidence() {
        let signals = vec![
            Signal::scored(SignalSource::Classifier, 0.1, ""),
            Signal::scored(SignalSource::LlmAdvisory, 0.3, ""),
        ];
        let verdict = aggregator().aggregate(&signals).unwrap();
        assert!(!verdict.is_fraud);
        assert!((verdict.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_absent_signals_do_not_suppress() {
        let signals = vec![
            Signal::absent(SignalSource::UrlReputation, "success=false"),
            Signal::scored(SignalSource::LlmAdvisory, 0.75, "75%"),
        ];
        let verdict = aggregator().aggregate(&signals).unwrap();
        assert!(verdict.is_fraud);
        assert_eq!(verdict.contributing_signals.len(), 1);
        assert_eq!(verdict.contributing_signals[0].source, SignalSource::LlmAdvisory);
    }

    #[test]
    fn test_no_signal() {
        let signals = vec![
            Signal::absent(SignalSource::Classifier, "timeout"),
            Signal::absent(SignalSource::UrlReputation, "success=false"),
            Signal::absent(SignalSource::LlmAdvisory, "unparseable"),
        ];
        assert!(matches!(aggregator().aggregate(&signals), Err(FraudError::NoSignal)));
        assert!(matches!(aggregator().aggregate(&[]), Err(FraudError::NoSignal)));
    }

    #[test]
    fn test_order_independence() {
        let signals = vec![
            Signal::scored(SignalSource::Classifier, 0.3, ""),
            Signal::new(SignalSource::IpReputation, Some(0.65), Some(false), ""),
            Signal::scored(SignalSource::LlmAdvisory, 0.2, ""),
            Signal::absent(SignalSource::UrlReputation, ""),
        ];

        let expected = aggregator().aggregate(&signals).unwrap();
        let mut reversed = signals.clone();
        reversed.reverse();
        let mut rotated = signals.clone();
        rotated.rotate_left(2);

        for permutation in [reversed, rotated] {
            let verdict = aggregator().aggregate(&permutation).unwrap();
            assert_eq!(verdict.is_fraud, expected.is_fraud);
            assert_eq!(verdict.confidence, expected.confidence);
        }
    }

    #[test]
    fn test_policy_validation() {
        let policy = AggregationPolicy {
            llm_threshold: 1.5,
            ..Default::default()
        };
        assert!(policy.validate().is_err());
        assert!(AggregationPolicy::default().validate().is_ok());
    }
}
