//! In-memory reputation checker for tests and offline runs

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{IpReputation, ReputationChecker, UrlReputation};

/// Returns canned results; unknown targets come back as failed lookups
#[derive(Default)]
pub struct MockReputation {
    ips: HashMap<String, IpReputation>,
    urls: HashMap<String, UrlReputation>,
    delay: Option<Duration>,
    ip_calls: AtomicUsize,
    url_calls: AtomicUsize,
}

impl MockReputation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ip(mut self, ip: impl Into<String>, reputation: IpReputation) -> Self {
        self.ips.insert(ip.into(), reputation);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>, reputation: UrlReputation) -> Self {
        self.urls.insert(url.into(), reputation);
        self
    }

    /// Sleep before answering, to exercise caller timeouts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn ip_calls(&self) -> usize {
        self.ip_calls.load(Ordering::SeqCst)
    }

    pub fn url_calls(&self) -> usize {
        self.url_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait::async_trait]
impl ReputationChecker for MockReputation {
    async fn check_ip(&self, ip: &str) -> IpReputation {
        self.ip_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.ips
            .get(ip)
            .cloned()
            .unwrap_or_else(|| IpReputation::failed("unknown ip"))
    }

    async fn check_url(&self, url: &str) -> UrlReputation {
        self.url_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.urls
            .get(url)
            .cloned()
            .unwrap_or_else(|| UrlReputation::failed("unknown url"))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_canned_results() {
        let mock = MockReputation::new().with_ip(
            "1.2.3.4",
            IpReputation {
                success: true,
                proxy: Some(false),
                fraud_score: Some(10),
                message: None,
            },
        );

        assert!(mock.check_ip("1.2.3.4").await.success);
        assert!(!mock.check_ip("5.6.7.8").await.success);
        assert!(!mock.check_url("http://x.test").await.success);
        assert_eq!(mock.ip_calls(), 2);
        assert_eq!(mock.url_calls(), 1);
    }
}
