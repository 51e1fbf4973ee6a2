//! Strict parsing of advisory replies
//!
//! Accepted shapes (case-insensitive, surrounding whitespace and a final period ignored):
//! `85%`, `85`, `12.5 %`, `Fraud: 85%`, `Spam - 90%`, `Legitimate`, `Fraud`.
//! Sentences, ranges, several numbers or values above 100 are rejected, and so is
//! a legitimate category followed by a percentage (`Legitimate: 90%`), whose
//! direction cannot be told apart.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::signal::{Signal, SignalSource};

/// Category named in a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisoryLabel {
    Fraud,
    Legitimate,
}

/// Structured reading of a reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    /// Fraud percentage, 0-100
    pub percent: Option<f64>,
    pub label: Option<AdvisoryLabel>,
}

impl Advisory {
    /// The percentage is read as a fraud percentage, as asked in the prompt.
    /// A category only counts when no percentage was given.
    pub fn to_signal(&self, raw: impl Into<String>) -> Signal {
        match (self.percent, self.label) {
            (Some(percent), _) => Signal::scored(SignalSource::LlmAdvisory, percent / 100.0, raw),
            (None, Some(label)) => {
                Signal::flagged(SignalSource::LlmAdvisory, label == AdvisoryLabel::Fraud, raw)
            }
            (None, None) => Signal::absent(SignalSource::LlmAdvisory, raw),
        }
    }
}

fn reply_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?i)^(?:(fraud|fraudulent|spam|scam|legitimate|legit|ham|safe)\s*[:\-]?\s*)?(?:(\d{1,3}(?:\.\d+)?)\s*%?)?\.?$",
            )
            .ok()
        })
        .as_ref()
}

/// Parse a reply, `None` when it is not in an accepted shape
pub fn parse_advisory(reply: &str) -> Option<Advisory> {
    let reply = reply.trim();
    if reply.is_empty() {
        return None;
    }

    let captures = reply_pattern()?.captures(reply)?;

    let label = captures.get(1).map(|m| match m.as_str().to_lowercase().as_str() {
        "legitimate" | "legit" | "ham" | "safe" => AdvisoryLabel::Legitimate,
        _ => AdvisoryLabel::Fraud,
    });

    let percent = match captures.get(2) {
        Some(m) => {
            let value: f64 = m.as_str().parse().ok()?;
            if !(0.0..=100.0).contains(&value) {
                return None;
            }
            Some(value)
        }
        None => None,
    };

    match (label, percent) {
        (None, None) => return None,
        (Some(AdvisoryLabel::Legitimate), Some(_)) => return None,
        _ => {}
    }

    Some(Advisory { percent, label })
}

/// Signal for a raw reply; unrecognised replies give an absent signal
pub fn advisory_signal(reply: &str) -> Signal {
    let raw = format!("reply={:?}", reply.trim());
    match parse_advisory(reply) {
        Some(advisory) => advisory.to_signal(raw),
        None => Signal::absent(SignalSource::LlmAdvisory, raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentages() {
        assert_eq!(parse_advisory("85%").unwrap().percent, Some(85.0));
        assert_eq!(parse_advisory(" 7 ").unwrap().percent, Some(7.0));
        assert_eq!(parse_advisory("12.5 %.").unwrap().percent, Some(12.5));
        assert_eq!(parse_advisory("100%").unwrap().percent, Some(100.0));

        let advisory = parse_advisory("Fraud: 90%").unwrap();
        assert_eq!(advisory.percent, Some(90.0));
        assert_eq!(advisory.label, Some(AdvisoryLabel::Fraud));
    }

    #[test]
    fn test_labels_only() {
        let advisory = parse_advisory("Legitimate.").unwrap();
        assert_eq!(advisory.label, Some(AdvisoryLabel::Legitimate));
        assert_eq!(advisory.percent, None);

        assert_eq!(parse_advisory("SPAM").unwrap().label, Some(AdvisoryLabel::Fraud));
    }

    #[test]
    fn test_rejects_legitimate_with_percentage() {
        for reply in ["Legitimate: 90%", "Safe - 80%", "ham 5%", "legit 100"] {
            assert!(parse_advisory(reply).is_none(), "accepted {:?}", reply);
            assert!(advisory_signal(reply).is_absent());
        }

        assert!(parse_advisory("Scam - 80%").is_some());
    }

    #[test]
    fn test_rejects_free_text() {
        for reply in [
            "",
            "I cannot determine that",
            "The probability is 85%",
            "85% or 90%",
            "between 40 and 60",
            "150%",
            "-5%",
        ] {
            assert!(parse_advisory(reply).is_none(), "accepted {:?}", reply);
        }
    }

    #[test]
    fn test_signal_conversion() {
        let signal = advisory_signal("85%");
        assert_eq!(signal.source, SignalSource::LlmAdvisory);
        assert_eq!(signal.score, Some(0.85));
        assert_eq!(signal.flag, None);

        let signal = advisory_signal("legitimate");
        assert_eq!(signal.flag, Some(false));
        assert_eq!(signal.score, None);

        assert!(advisory_signal("I cannot determine that").is_absent());
    }
}
