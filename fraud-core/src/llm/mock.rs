//! Mock advisor for testing
//!
//! Answers with a fraud percentage based on a few scam keywords, or with a fixed
//! reply / failure when configured.

use anyhow::Result;
use std::time::Duration;
use tracing::debug;

use super::AdvisoryClient;

/// Scam vocabulary and its weight in the reply percentage
const PATTERNS: &[(&str, u32)] = &[
    ("free", 20),
    ("win", 20),
    ("winner", 25),
    ("prize", 25),
    ("claim", 20),
    ("urgent", 20),
    ("verify", 20),
    ("account", 10),
    ("click", 15),
    ("cash", 15),
    ("suspended", 25),
];

enum Behavior {
    Keywords,
    Fixed(String),
    Fail(String),
}

/// Mock advisor implementation for testing
pub struct MockAdvisor {
    model_name: String,
    behavior: Behavior,
    delay: Option<Duration>,
}

impl MockAdvisor {
    pub fn new() -> Self {
        Self {
            model_name: "mock-advisor-v1".to_string(),
            behavior: Behavior::Keywords,
            delay: None,
        }
    }

    /// Always answer `reply`
    pub fn fixed(reply: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::Fixed(reply.into()),
            ..Self::new()
        }
    }

    /// Always fail with `error`
    pub fn failing(error: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::Fail(error.into()),
            ..Self::new()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn keyword_percent(&self, prompt: &str) -> u32 {
        let lower = prompt.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let score: u32 = PATTERNS
            .iter()
            .filter(|(pattern, _)| words.contains(pattern))
            .map(|(_, weight)| weight)
            .sum();
        let links = if lower.contains("http://") || lower.contains("https://") {
            15
        } else {
            0
        };

        (5 + score + links).min(99)
    }
}

impl Default for MockAdvisor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AdvisoryClient for MockAdvisor {
    async fn complete(&self, prompt: &str) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = match &self.behavior {
            Behavior::Keywords => format!("{}%", self.keyword_percent(prompt)),
            Behavior::Fixed(reply) => reply.clone(),
            Behavior::Fail(error) => anyhow::bail!("{}", error),
        };

        debug!("MockAdvisor: replied {:?}", reply);
        Ok(reply)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{fraud_prompt, parse_advisory};

    #[tokio::test]
    async fn test_keyword_replies_parse() {
        let advisor = MockAdvisor::new();

        let scam = advisor
            .complete(&fraud_prompt("URGENT: your account is suspended, verify at http://x.test"))
            .await
            .unwrap();
        let benign = advisor.complete(&fraud_prompt("see you at lunch")).await.unwrap();

        let scam = parse_advisory(&scam).unwrap().percent.unwrap();
        let benign = parse_advisory(&benign).unwrap().percent.unwrap();
        assert!(scam >= 80.0);
        assert!(benign <= 10.0);
    }

    #[tokio::test]
    async fn test_fixed_and_failing() {
        assert_eq!(MockAdvisor::fixed("Legitimate").complete("x").await.unwrap(), "Legitimate");
        assert!(MockAdvisor::failing("boom").complete("x").await.is_err());
    }
}
