//! IP/URL reputation checking
//!
//! Clients never return errors: a failed lookup is reported as `success = false`,
//! which the aggregator treats as an absent signal.

use serde::{Deserialize, Serialize};

use crate::signal::{Signal, SignalSource};

pub mod ipqs;
pub mod mock;

pub use ipqs::IpqsClient;
pub use mock::MockReputation;

/// IP lookup result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpReputation {
    pub success: bool,
    pub proxy: Option<bool>,
    /// 0-100
    pub fraud_score: Option<u32>,
    /// Service or transport message when the lookup failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl IpReputation {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn to_signal(&self, ip: &str) -> Signal {
        if !self.success {
            return Signal::absent(
                SignalSource::IpReputation,
                format!(
                    "ip={} success=false {}",
                    ip,
                    self.message.as_deref().unwrap_or_default()
                )
                .trim_end()
                .to_string(),
            );
        }

        Signal::new(
            SignalSource::IpReputation,
            self.fraud_score.map(|s| f64::from(s.min(100)) / 100.0),
            self.proxy,
            format!("ip={} proxy={:?} fraud_score={:?}", ip, self.proxy, self.fraud_score),
        )
    }
}

/// URL lookup result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UrlReputation {
    pub success: bool,
    pub suspicious: Option<bool>,
    pub phishing: Option<bool>,
    pub malware: Option<bool>,
    pub parking: Option<bool>,
    /// 0-100
    pub risk_score: Option<u32>,
    /// Address the URL's host resolved to
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UrlReputation {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Combined categorical flag; `None` when the service reported no flags at all
    pub fn flag(&self, parked_is_fraud: bool) -> Option<bool> {
        let mut flags = vec![self.suspicious, self.phishing, self.malware];
        if parked_is_fraud {
            flags.push(self.parking);
        }

        let known: Vec<bool> = flags.into_iter().flatten().collect();
        if known.is_empty() {
            None
        } else {
            Some(known.into_iter().any(|f| f))
        }
    }

    pub fn to_signal(&self, url: &str, parked_is_fraud: bool) -> Signal {
        if !self.success {
            return Signal::absent(
                SignalSource::UrlReputation,
                format!(
                    "url={} success=false {}",
                    url,
                    self.message.as_deref().unwrap_or_default()
                )
                .trim_end()
                .to_string(),
            );
        }

        Signal::new(
            SignalSource::UrlReputation,
            self.risk_score.map(|s| f64::from(s.min(100)) / 100.0),
            self.flag(parked_is_fraud),
            format!(
                "url={} suspicious={:?} phishing={:?} malware={:?} parking={:?} risk_score={:?}",
                url, self.suspicious, self.phishing, self.malware, self.parking, self.risk_score
            ),
        )
    }
}

/// Reputation service client
#[async_trait::async_trait]
pub trait ReputationChecker: Send + Sync {
    async fn check_ip(&self, ip: &str) -> IpReputation;

    async fn check_url(&self, url: &str) -> UrlReputation;

    /// Service name for logs
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_lookup_is_absent() {
        let signal = IpReputation::failed("invalid key").to_signal("1.2.3.4");
        assert!(signal.is_absent());
        assert!(signal.raw.contains("invalid key"));

        let signal = UrlReputation::failed("timeout").to_signal("http://x.test", false);
        assert!(signal.is_absent());
    }

    #[test]
    fn test_ip_signal() {
        let rep = IpReputation {
            success: true,
            proxy: Some(true),
            fraud_score: Some(35),
            message: None,
        };
        let signal = rep.to_signal("10.0.0.1");
        assert_eq!(signal.flag, Some(true));
        assert_eq!(signal.score, Some(0.35));
    }

    #[test]
    fn test_url_flags() {
        let mut rep = UrlReputation {
            success: true,
            suspicious: Some(false),
            phishing: Some(false),
            malware: Some(false),
            parking: Some(true),
            risk_score: Some(80),
            ..Default::default()
        };
        assert_eq!(rep.flag(false), Some(false));
        assert_eq!(rep.flag(true), Some(true));

        rep.phishing = Some(true);
        let signal = rep.to_signal("https://example.test", false);
        assert_eq!(signal.flag, Some(true));
        assert_eq!(signal.score, Some(0.8));

        let bare = UrlReputation {
            success: true,
            risk_score: Some(10),
            ..Default::default()
        };
        assert_eq!(bare.flag(true), None);
    }
}
