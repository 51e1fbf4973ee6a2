//! IPQualityScore reputation client
//!
//! Uses the JSON proxy-detection (`/ip`) and malicious URL scanner (`/url`)
//! endpoints. The API key is a path segment, so request URLs are never logged.

use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{IpReputation, ReputationChecker, UrlReputation};
use crate::config::ReputationConfig;
use crate::error::{FraudError, Result};

/// Stateless client built from an explicit configuration
pub struct IpqsClient {
    config: ReputationConfig,
    api_key: String,
    client: reqwest::Client,
}

/// `/ip` response subset
#[derive(Debug, Deserialize)]
struct IpqsIpResponse {
    #[serde(default)]
    success: bool,
    message: Option<String>,
    proxy: Option<bool>,
    fraud_score: Option<f64>,
}

/// `/url` response subset
#[derive(Debug, Deserialize)]
struct IpqsUrlResponse {
    #[serde(default)]
    success: bool,
    message: Option<String>,
    suspicious: Option<bool>,
    phishing: Option<bool>,
    malware: Option<bool>,
    parking: Option<bool>,
    risk_score: Option<f64>,
    ip_address: Option<String>,
}

impl IpqsClient {
    pub fn new(config: ReputationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| FraudError::Config("reputation.api_key is not set".to_string()))?;

        Url::parse(&config.base_url)
            .map_err(|e| FraudError::Config(format!("Invalid reputation base_url: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn endpoint(&self, kind: &str, target: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| FraudError::Config(format!("Invalid reputation base_url: {}", e)))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                FraudError::Config("reputation base_url cannot hold a path".to_string())
            })?;
            segments.pop_if_empty().push(kind).push(&self.api_key).push(target);
        }
        Ok(url)
    }

    async fn fetch_ip(&self, ip: &str) -> Result<IpqsIpResponse> {
        let strictness = self.config.strictness.to_string();
        let response = self
            .client
            .get(self.endpoint("ip", ip)?)
            .query(&[
                ("strictness", strictness.as_str()),
                ("user_agent", self.config.user_agent.as_str()),
                ("user_language", self.config.user_language.as_str()),
                (
                    "allow_public_access_points",
                    bool_param(self.config.allow_public_access_points),
                ),
                ("lighter_penalties", bool_param(self.config.lighter_penalties)),
            ])
            .send()
            .await
            .map_err(strip_url)?
            .error_for_status()
            .map_err(strip_url)?;

        Ok(response.json().await.map_err(strip_url)?)
    }

    async fn fetch_url(&self, target: &str) -> Result<IpqsUrlResponse> {
        let strictness = self.config.strictness.to_string();
        let timeout = (self.config.timeout_ms / 1000).max(1).to_string();
        let response = self
            .client
            .get(self.endpoint("url", target)?)
            .query(&[("strictness", strictness.as_str()), ("timeout", timeout.as_str())])
            .send()
            .await
            .map_err(strip_url)?
            .error_for_status()
            .map_err(strip_url)?;

        Ok(response.json().await.map_err(strip_url)?)
    }
}

#[async_trait::async_trait]
impl ReputationChecker for IpqsClient {
    async fn check_ip(&self, ip: &str) -> IpReputation {
        match self.fetch_ip(ip).await {
            Ok(body) if body.success => {
                debug!(ip, fraud_score = ?body.fraud_score, proxy = ?body.proxy, "IPQS ip lookup");
                IpReputation {
                    success: true,
                    proxy: body.proxy,
                    fraud_score: body.fraud_score.map(to_percent),
                    message: None,
                }
            }
            Ok(body) => {
                let message = body.message.unwrap_or_else(|| "unsuccessful request".to_string());
                warn!(ip, %message, "IPQS ip lookup unsuccessful");
                IpReputation::failed(message)
            }
            Err(e) => {
                warn!(ip, error = %e, "IPQS ip lookup failed");
                IpReputation::failed(e.to_string())
            }
        }
    }

    async fn check_url(&self, url: &str) -> UrlReputation {
        match self.fetch_url(url).await {
            Ok(body) if body.success => {
                debug!(url, risk_score = ?body.risk_score, "IPQS url lookup");
                UrlReputation {
                    success: true,
                    suspicious: body.suspicious,
                    phishing: body.phishing,
                    malware: body.malware,
                    parking: body.parking,
                    risk_score: body.risk_score.map(to_percent),
                    ip_address: body.ip_address.filter(|ip| !ip.is_empty()),
                    message: None,
                }
            }
            Ok(body) => {
                let message = body.message.unwrap_or_else(|| "unsuccessful request".to_string());
                warn!(url, %message, "IPQS url lookup unsuccessful");
                UrlReputation::failed(message)
            }
            Err(e) => {
                warn!(url, error = %e, "IPQS url lookup failed");
                UrlReputation::failed(e.to_string())
            }
        }
    }

    fn name(&self) -> &str {
        "ipqualityscore"
    }
}

fn bool_param(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn to_percent(score: f64) -> u32 {
    score.clamp(0.0, 100.0).round() as u32
}

/// The request URL embeds the API key
fn strip_url(e: reqwest::Error) -> FraudError {
    FraudError::Http(e.without_url())
}
