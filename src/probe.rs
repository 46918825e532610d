//! HTTP connectivity probing source
//!
//! Polls a lightweight HTTP endpoint and reports reachability transitions.
//! Useful on desktop platforms that have no push-style connectivity API.

use crate::models::ReachabilityStatus;
use crate::service::{ReachabilityError, ReachabilityResult};
use crate::source::{ConnectivitySource, SourceHandle};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default probe target; any response at all proves connectivity
const DEFAULT_PROBE_URL: &str = "http://cp.cloudflare.com/generate_204";
/// Probe interval while reachable
const PROBE_INTERVAL_SECONDS: u64 = 30;
/// Probe interval while unreachable (probe more often to notice recovery)
const OFFLINE_PROBE_INTERVAL_SECONDS: u64 = 10;
/// Per-request timeout
const PROBE_TIMEOUT_SECONDS: u64 = 10;

/// Configuration for HTTP connectivity probing
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub url: String,
    pub interval_secs: u64,
    pub offline_interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_PROBE_URL.to_string(),
            interval_secs: PROBE_INTERVAL_SECONDS,
            offline_interval_secs: OFFLINE_PROBE_INTERVAL_SECONDS,
            timeout_secs: PROBE_TIMEOUT_SECONDS,
        }
    }
}

/// Connectivity source that probes an HTTP endpoint on an interval.
///
/// Probe intervals are jittered so that many clients do not hit the probe
/// endpoint in lockstep. After `stop` the probe loop releases its handle at
/// its next wakeup.
pub struct HttpProbeSource {
    config: ProbeConfig,
    running: Arc<AtomicBool>,
}

impl HttpProbeSource {
    /// Create a probe source; the probe loop starts once the source is
    /// handed to the service
    pub fn new(config: ProbeConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl ConnectivitySource for HttpProbeSource {
    fn start(&mut self, handle: SourceHandle) -> ReachabilityResult<()> {
        if self.config.url.trim().is_empty() {
            return Err(ReachabilityError::InvalidConfig(
                "probe url is empty".to_string(),
            ));
        }
        if self.config.interval_secs == 0 || self.config.offline_interval_secs == 0 {
            return Err(ReachabilityError::InvalidConfig(
                "probe interval must be at least 1 second".to_string(),
            ));
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ReachabilityError::Unavailable(
                "probe source already started".to_string(),
            ));
        }

        let client = match reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(self.config.timeout_secs))
            .connect_timeout(std::time::Duration::from_secs(self.config.timeout_secs))
            .user_agent("NetReachability/0.1.0")
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(ReachabilityError::Unavailable(format!(
                    "HTTP client build failed: {}",
                    e
                )));
            }
        };

        let config = self.config.clone();
        let running = self.running.clone();

        log::info!(
            "Starting HTTP connectivity probe against {} every {}s",
            config.url,
            config.interval_secs
        );

        tokio::spawn(async move {
            let mut last: Option<ReachabilityStatus> = None;
            while running.load(Ordering::SeqCst) {
                // Any response proves connectivity, error status codes
                // included. Transport type is not detectable from a probe.
                let status = match client.head(&config.url).send().await {
                    Ok(_) => ReachabilityStatus::Reachable { via_wifi: false },
                    Err(e) => {
                        log::debug!("Connectivity probe failed: {}", e);
                        ReachabilityStatus::Unreachable
                    }
                };

                if last != Some(status) {
                    if !handle.report(status) {
                        break;
                    }
                    last = Some(status);
                }

                let base = if status.is_reachable() {
                    config.interval_secs
                } else {
                    config.offline_interval_secs
                };
                let jitter = rand::rng().random_range(0..=base / 4);
                tokio::time::sleep(std::time::Duration::from_secs(base + jitter)).await;
            }
            // Handle is released here, ending the feed
        });

        Ok(())
    }

    fn stop(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            log::info!("Stopping HTTP connectivity probe");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ReachabilityService;

    #[tokio::test]
    async fn test_empty_url_rejected() {
        let config = ProbeConfig {
            url: "  ".to_string(),
            ..Default::default()
        };
        let result = ReachabilityService::new(Box::new(HttpProbeSource::new(config)));
        assert!(matches!(result, Err(ReachabilityError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let config = ProbeConfig {
            interval_secs: 0,
            ..Default::default()
        };
        let result = ReachabilityService::new(Box::new(HttpProbeSource::new(config)));
        assert!(matches!(result, Err(ReachabilityError::InvalidConfig(_))));
    }

    #[test]
    fn test_default_config() {
        let config = ProbeConfig::default();
        assert!(config.url.starts_with("http"));
        assert_eq!(config.interval_secs, PROBE_INTERVAL_SECONDS);
        assert_eq!(config.offline_interval_secs, OFFLINE_PROBE_INTERVAL_SECONDS);
    }
}
