//! Signal and verdict types
//!
//! A [`Signal`] is one source's opinion about a message. Signals are produced per
//! request and never persisted. The aggregator folds them into a [`Verdict`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a signal came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// Sequence classifier over the message text
    Classifier,
    /// IP reputation lookup
    IpReputation,
    /// URL reputation lookup
    UrlReputation,
    /// LLM advisory reply
    LlmAdvisory,
}

impl SignalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalSource::Classifier => "classifier",
            SignalSource::IpReputation => "ip_reputation",
            SignalSource::UrlReputation => "url_reputation",
            SignalSource::LlmAdvisory => "llm_advisory",
        }
    }

    /// Sources whose true flag overrides their numeric score
    pub fn is_reputation(&self) -> bool {
        matches!(self, SignalSource::IpReputation | SignalSource::UrlReputation)
    }
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One source's opinion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Producing source
    pub source: SignalSource,
    /// Normalized score in [0,1], `None` when the source gave no number
    pub score: Option<f64>,
    /// Explicit categorical flag, `None` when the source gave no flag
    pub flag: Option<bool>,
    /// Diagnostic text (never used for decisions)
    pub raw: String,
}

impl Signal {
    pub fn new(
        source: SignalSource,
        score: Option<f64>,
        flag: Option<bool>,
        raw: impl Into<String>,
    ) -> Self {
        Self {
            source,
            score,
            flag,
            raw: raw.into(),
        }
    }

    /// Numeric-only signal
    pub fn scored(source: SignalSource, score: f64, raw: impl Into<String>) -> Self {
        Self::new(source, Some(score), None, raw)
    }

    /// Flag-only signal
    pub fn flagged(source: SignalSource, flag: bool, raw: impl Into<String>) -> Self {
        Self::new(source, None, Some(flag), raw)
    }

    /// A source that yielded nothing (failure, timeout, unparseable reply)
    pub fn absent(source: SignalSource, raw: impl Into<String>) -> Self {
        Self::new(source, None, None, raw)
    }

    /// Score clamped to [0,1]; NaN and infinities count as no score
    pub fn normalized_score(&self) -> Option<f64> {
        self.score
            .filter(|s| s.is_finite())
            .map(|s| s.clamp(0.0, 1.0))
    }

    /// True when the signal carries neither a usable score nor a flag
    pub fn is_absent(&self) -> bool {
        self.normalized_score().is_none() && self.flag.is_none()
    }
}

/// Final aggregation output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_fraud: bool,
    /// Confidence in the verdict direction, in [0,1]
    pub confidence: f64,
    /// Present signals, in input order
    pub contributing_signals: Vec<Signal>,
}

impl Verdict {
    /// Probability-like fraud percentage (0-100) derived from the verdict
    pub fn fraud_percent(&self) -> f64 {
        let p = if self.is_fraud {
            self.confidence
        } else {
            1.0 - self.confidence
        };
        (p * 10000.0).round() / 100.0
    }

    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_verdict(self)
    }

    /// Human readable summary
    pub fn explanation(&self) -> String {
        let sources: Vec<&str> = self
            .contributing_signals
            .iter()
            .map(|s| s.source.as_str())
            .collect();

        format!(
            "The final fraud/spam risk score is {:.0}, which indicates a {} risk level \
             (signals: {}).",
            self.fraud_percent(),
            self.risk_level(),
            sources.join(", ")
        )
    }
}

/// Coarse risk bucket shown to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn from_verdict(verdict: &Verdict) -> Self {
        if !verdict.is_fraud {
            RiskLevel::Low
        } else if verdict.confidence >= 0.8 {
            RiskLevel::High
        } else {
            RiskLevel::Moderate
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => f.write_str("low"),
            RiskLevel::Moderate => f.write_str("moderate"),
            RiskLevel::High => f.write_str("high"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_detection() {
        assert!(Signal::absent(SignalSource::UrlReputation, "success=false").is_absent());
        assert!(Signal::new(SignalSource::LlmAdvisory, Some(f64::NAN), None, "").is_absent());
        assert!(!Signal::flagged(SignalSource::IpReputation, false, "").is_absent());
        assert!(!Signal::scored(SignalSource::Classifier, 0.0, "").is_absent());
    }

    #[test]
    fn test_normalized_score_clamps() {
        let signal = Signal::scored(SignalSource::Classifier, 1.7, "");
        assert_eq!(signal.normalized_score(), Some(1.0));
        let signal = Signal::scored(SignalSource::Classifier, -0.2, "");
        assert_eq!(signal.normalized_score(), Some(0.0));
    }

    #[test]
    fn test_risk_levels() {
        let mut verdict = Verdict {
            is_fraud: true,
            confidence: 0.9,
            contributing_signals: vec![Signal::scored(SignalSource::Classifier, 0.9, "")],
        };
        assert_eq!(verdict.risk_level(), RiskLevel::High);
        assert_eq!(verdict.fraud_percent(), 90.0);

        verdict.confidence = 0.6;
        assert_eq!(verdict.risk_level(), RiskLevel::Moderate);

        verdict.is_fraud = false;
        assert_eq!(verdict.risk_level(), RiskLevel::Low);
        assert_eq!(verdict.fraud_percent(), 40.0);
        assert!(verdict.explanation().contains("low risk level"));
        assert!(verdict.explanation().contains("classifier"));
    }

    #[test]
    fn test_source_serialization() {
        let json = serde_json::to_string(&SignalSource::UrlReputation).unwrap();
        assert_eq!(json, "\"url_reputation\"");
    }
}
