//! LLM advisory abstraction
//!
//! The LLM is asked for a fraud percentage in free text. Its reply only becomes a
//! signal when [`parser::parse_advisory`] recognises it; anything else is absent.

use std::sync::Arc;

use crate::config::{LlmConfig, LlmProvider};
use crate::error::{FraudError, Result};

pub mod mock;
pub mod ollama;
pub mod openai;
pub mod parser;

pub use mock::MockAdvisor;
pub use ollama::OllamaAdvisor;
pub use openai::OpenAiAdvisor;
pub use parser::{advisory_signal, parse_advisory, Advisory, AdvisoryLabel};

/// Question appended to every message
pub const FRAUD_QUESTION: &str = "Is this message fraud? Write only percentage of fraud.";

/// Prompt sent for a message
pub fn fraud_prompt(message: &str) -> String {
    format!("{}\n\n{}", message.trim(), FRAUD_QUESTION)
}

/// Text completion client
#[async_trait::async_trait]
pub trait AdvisoryClient: Send + Sync {
    /// Single-turn completion, returns the raw reply text
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;

    /// Ask whether `message` is fraud
    async fn advise(&self, message: &str) -> anyhow::Result<String> {
        self.complete(&fraud_prompt(message)).await
    }

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Build the configured advisor, `None` when the LLM is disabled
pub fn build_advisor(config: &LlmConfig) -> Result<Option<Arc<dyn AdvisoryClient>>> {
    let advisor: Arc<dyn AdvisoryClient> = match config.provider {
        LlmProvider::None => return Ok(None),
        LlmProvider::Mock => Arc::new(MockAdvisor::new()),
        LlmProvider::Ollama => Arc::new(OllamaAdvisor::from_config(config)?),
        LlmProvider::OpenAi => {
            let api_key = config
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| {
                    FraudError::Config("llm.api_key is required for openai".to_string())
                })?;
            Arc::new(OpenAiAdvisor::from_config(config, api_key)?)
        }
    };
    Ok(Some(advisor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_ends_with_question() {
        let prompt = fraud_prompt("  WIN a free iPhone now ");
        assert!(prompt.starts_with("WIN a free iPhone now"));
        assert!(prompt.ends_with(FRAUD_QUESTION));
    }

    #[test]
    fn test_build_advisor() {
        assert!(build_advisor(&LlmConfig::default()).unwrap().is_none());

        let mock = build_advisor(&LlmConfig {
            provider: LlmProvider::Mock,
            ..Default::default()
        })
        .unwrap()
        .unwrap();
        assert_eq!(mock.model_name(), "mock-advisor-v1");

        let missing_key = build_advisor(&LlmConfig {
            provider: LlmProvider::OpenAi,
            ..Default::default()
        });
        assert!(matches!(missing_key, Err(FraudError::Config(_))));
    }
}
