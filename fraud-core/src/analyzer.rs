//! Per-message analysis
//!
//! Runs the classifier on the published model, fans out to the LLM advisor and the
//! reputation service under per-source timeouts, then aggregates everything into an
//! [`Analysis`]. Remote failures and timeouts become absent signals; only classifier
//! errors and [`FraudError::NoSignal`] reach the caller.

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::future::Future;
use std::net::IpAddr;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::aggregator::FraudAggregator;
use crate::classifier::ModelStore;
use crate::config::{AnalyzerConfig, FraudConfig};
use crate::error::{FraudError, Result};
use crate::llm::{advisory_signal, build_advisor, AdvisoryClient};
use crate::reputation::{IpReputation, IpqsClient, ReputationChecker, UrlReputation};
use crate::signal::{RiskLevel, Signal, SignalSource, Verdict};

/// Outcome for one message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub message: String,
    /// URLs found in the message (checked, when reputation is enabled)
    pub urls: Vec<String>,
    pub verdict: Verdict,
    pub risk_level: RiskLevel,
    /// 0-100
    pub fraud_percent: f64,
    pub explanation: String,
    /// Every signal gathered, absent ones included
    pub signals: Vec<Signal>,
    pub elapsed_ms: u64,
}

/// One entry of a batch
#[derive(Debug)]
pub struct BatchOutcome {
    pub message: String,
    pub outcome: Result<Analysis>,
}

/// Message analyzer
pub struct FraudAnalyzer {
    store: Arc<ModelStore>,
    reputation: Option<Arc<dyn ReputationChecker>>,
    advisor: Option<Arc<dyn AdvisoryClient>>,
    aggregator: FraudAggregator,
    config: AnalyzerConfig,
}

impl FraudAnalyzer {
    pub fn new(
        store: Arc<ModelStore>,
        aggregator: FraudAggregator,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            store,
            reputation: None,
            advisor: None,
            aggregator,
            config,
        }
    }

    pub fn with_reputation(mut self, checker: Arc<dyn ReputationChecker>) -> Self {
        self.reputation = Some(checker);
        self
    }

    pub fn with_advisor(mut self, advisor: Arc<dyn AdvisoryClient>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    /// Wire the store and the remote clients described by `config`
    pub fn from_config(config: &FraudConfig) -> Result<Self> {
        let store = Arc::new(ModelStore::new(config.model.clone()));
        let mut analyzer = Self::new(
            store,
            FraudAggregator::new(config.policy.clone()),
            config.analyzer.clone(),
        );

        if config.reputation.is_enabled() {
            let client = IpqsClient::new(config.reputation.clone())?;
            info!(service = client.name(), "reputation checks enabled");
            analyzer = analyzer.with_reputation(Arc::new(client));
        } else {
            info!("reputation checks disabled (no api key)");
        }

        if let Some(advisor) = build_advisor(&config.llm)? {
            info!(model = advisor.model_name(), "LLM advisory enabled");
            analyzer = analyzer.with_advisor(advisor);
        }

        Ok(analyzer)
    }

    pub fn store(&self) -> &Arc<ModelStore> {
        &self.store
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze one message
    pub async fn analyze(&self, message: &str) -> Result<Analysis> {
        let started = Instant::now();

        let model = self.store.snapshot().await?;
        let classifier = model.signal(message)?;

        let urls = extract_urls(message, self.config.max_urls);
        let ips = if self.config.check_bare_ips {
            extract_ips(message)
        } else {
            Vec::new()
        };

        let (llm, url_signals, ip_signals) = tokio::join!(
            self.llm_signal(message),
            self.url_signals(&urls),
            self.ip_signals(&ips),
        );

        let mut signals = Vec::with_capacity(2 + url_signals.len() + ip_signals.len());
        signals.push(classifier);
        signals.extend(llm);
        signals.extend(url_signals);
        signals.extend(ip_signals);

        let verdict = self.aggregator.aggregate(&signals)?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        debug!(
            is_fraud = verdict.is_fraud,
            confidence = verdict.confidence,
            urls = urls.len(),
            elapsed_ms,
            "message analyzed"
        );

        Ok(Analysis {
            message: message.to_string(),
            urls,
            risk_level: verdict.risk_level(),
            fraud_percent: verdict.fraud_percent(),
            explanation: verdict.explanation(),
            verdict,
            signals,
            elapsed_ms,
        })
    }

    /// Analyze distinct messages, at most `batch_concurrency` at a time.
    /// Results are ordered by message text.
    pub async fn analyze_batch<I>(&self, messages: I) -> Vec<BatchOutcome>
    where
        I: IntoIterator<Item = String>,
    {
        let unique: BTreeSet<String> = messages.into_iter().collect();
        let concurrency = self.config.batch_concurrency.max(1);
        debug!(messages = unique.len(), concurrency, "analyzing batch");

        stream::iter(unique)
            .map(|message| async move {
                let outcome = self.analyze(&message).await;
                BatchOutcome { message, outcome }
            })
            .buffered(concurrency)
            .collect()
            .await
    }

    async fn llm_signal(&self, message: &str) -> Option<Signal> {
        let advisor = self.advisor.as_ref()?;

        let signal = match within(
            SignalSource::LlmAdvisory,
            self.config.llm_timeout_ms,
            advisor.advise(message),
        )
        .await
        {
            Ok(Ok(reply)) => {
                let signal = advisory_signal(&reply);
                if signal.is_absent() {
                    warn!(
                        model = advisor.model_name(),
                        reply = %reply.trim(),
                        "unrecognised LLM reply"
                    );
                }
                signal
            }
            Ok(Err(e)) => {
                warn!(model = advisor.model_name(), error = %e, "LLM advisory failed");
                Signal::absent(SignalSource::LlmAdvisory, format!("error={}", e))
            }
            Err(e) => Signal::absent(SignalSource::LlmAdvisory, e.to_string()),
        };
        Some(signal)
    }

    async fn url_signals(&self, urls: &[String]) -> Vec<Signal> {
        let Some(checker) = self.reputation.as_deref() else {
            return Vec::new();
        };

        join_all(urls.iter().map(|url| self.check_url(checker, url)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    async fn ip_signals(&self, ips: &[String]) -> Vec<Signal> {
        let Some(checker) = self.reputation.as_deref() else {
            return Vec::new();
        };

        join_all(ips.iter().map(|ip| self.check_ip(checker, ip))).await
    }

    /// URL signal, followed by the hosting IP's signal for a clean URL
    async fn check_url(&self, checker: &dyn ReputationChecker, url: &str) -> Vec<Signal> {
        let reputation = within(
            SignalSource::UrlReputation,
            self.config.reputation_timeout_ms,
            checker.check_url(url),
        )
        .await
        .unwrap_or_else(|e| UrlReputation::failed(e.to_string()));

        let parked_is_fraud = self.config.parked_domain_is_fraud;
        let mut signals = vec![reputation.to_signal(url, parked_is_fraud)];

        if self.config.follow_url_ip
            && reputation.success
            && reputation.flag(parked_is_fraud) != Some(true)
        {
            if let Some(ip) = reputation.ip_address.as_deref() {
                debug!(url, ip, "checking URL host address");
                signals.push(self.check_ip(checker, ip).await);
            }
        }

        signals
    }

    async fn check_ip(&self, checker: &dyn ReputationChecker, ip: &str) -> Signal {
        within(
            SignalSource::IpReputation,
            self.config.reputation_timeout_ms,
            checker.check_ip(ip),
        )
        .await
        .unwrap_or_else(|e| IpReputation::failed(e.to_string()))
        .to_signal(ip)
    }
}

/// Run `future` under a time budget; a timeout is logged and returned as an error
async fn within<F: Future>(signal: SignalSource, timeout_ms: u64, future: F) -> Result<F::Output> {
    tokio::time::timeout(Duration::from_millis(timeout_ms), future)
        .await
        .map_err(|_| {
            let error = FraudError::SignalTimeout { signal, timeout_ms };
            warn!(%error, "signal source timed out");
            error
        })
}

fn url_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)https?://\S+").ok())
        .as_ref()
}

fn is_trailing_punctuation(c: char) -> bool {
    matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | ')' | ']' | '}' | '>' | '"' | '\'')
}

/// Distinct `http(s)://` URLs in order of appearance, at most `limit`
pub fn extract_urls(message: &str, limit: usize) -> Vec<String> {
    let Some(pattern) = url_pattern() else {
        return Vec::new();
    };

    let mut urls: Vec<String> = Vec::new();
    for found in pattern.find_iter(message) {
        if urls.len() >= limit {
            break;
        }

        let url = found.as_str().trim_end_matches(is_trailing_punctuation);
        let has_host = url
            .split_once("://")
            .map_or(false, |(_, rest)| !rest.is_empty());
        if has_host && !urls.iter().any(|u| u == url) {
            urls.push(url.to_string());
        }
    }
    urls
}

/// Distinct IPv4/IPv6 addresses written as standalone words
pub fn extract_ips(message: &str) -> Vec<String> {
    let mut ips: Vec<String> = Vec::new();

    for word in message.split_whitespace() {
        if word.contains("://") {
            continue;
        }

        let candidate = word
            .trim_start_matches(|c: char| matches!(c, '(' | '[' | '"' | '\''))
            .trim_end_matches(|c: char| is_trailing_punctuation(c) && c != ':');
        let Ok(ip) = candidate.parse::<IpAddr>() else {
            continue;
        };
        if ip.is_unspecified() || ip.is_loopback() {
            continue;
        }

        let ip = ip.to_string();
        if !ips.contains(&ip) {
            ips.push(ip);
        }
    }
    ips
}
