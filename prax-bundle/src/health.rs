//! Health probes.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use crate::driver::ClusterClient;

/// How long a cluster ping may take before the probe reports unhealthy.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Outcome of a single health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheckResult {
    healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl HealthCheckResult {
    /// A healthy result.
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            message: None,
            error: None,
        }
    }

    /// A healthy result with a message.
    pub fn healthy_with(message: impl Into<String>) -> Self {
        Self {
            healthy: true,
            message: Some(message.into()),
            error: None,
        }
    }

    /// An unhealthy result.
    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: Some(message.into()),
            error: None,
        }
    }

    /// An unhealthy result carrying the error that caused it.
    pub fn unhealthy_error(message: impl Into<String>, error: &dyn fmt::Display) -> Self {
        Self {
            healthy: false,
            message: Some(message.into()),
            error: Some(error.to_string()),
        }
    }

    /// Whether the probe succeeded.
    pub fn is_healthy(&self) -> bool {
        self.healthy
    }

    /// Message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Error detail, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// A probe the host runs on its own schedule.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Run the probe once.
    async fn check(&self) -> HealthCheckResult;
}

/// Pings a cluster client; healthy iff the ping succeeds in time.
pub struct ClusterHealthCheck<C: ClusterClient> {
    client: Arc<C>,
    timeout: Duration,
}

impl<C: ClusterClient> ClusterHealthCheck<C> {
    /// Probe `client` with the default timeout.
    pub fn new(client: Arc<C>) -> Self {
        Self::with_timeout(client, DEFAULT_PROBE_TIMEOUT)
    }

    /// Probe `client`, giving up after `timeout`.
    pub fn with_timeout(client: Arc<C>, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl<C: ClusterClient> HealthCheck for ClusterHealthCheck<C> {
    async fn check(&self) -> HealthCheckResult {
        match tokio::time::timeout(self.timeout, self.client.ping()).await {
            Ok(Ok(())) => HealthCheckResult::healthy(),
            Ok(Err(e)) => {
                warn!(error = %e, "Cluster ping failed");
                HealthCheckResult::unhealthy_error("cluster ping failed", &e)
            }
            Err(elapsed) => {
                warn!(timeout = ?self.timeout, "Cluster ping timed out");
                HealthCheckResult::unhealthy_error(
                    format!("cluster ping timed out after {:?}", self.timeout),
                    &elapsed,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MockClusterClient;
    use crate::error::{BundleError, BundleResult};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_healthy_when_ping_succeeds() {
        let mut client = MockClusterClient::new();
        client.expect_ping().times(1).returning(|| Ok(()));

        let check = ClusterHealthCheck::new(Arc::new(client));
        assert_eq!(check.check().await, HealthCheckResult::healthy());
    }

    #[tokio::test]
    async fn test_unhealthy_when_ping_fails() {
        let mut client = MockClusterClient::new();
        client
            .expect_ping()
            .returning(|| Err(BundleError::driver("all nodes down")));

        let check = ClusterHealthCheck::new(Arc::new(client));
        let result = check.check().await;
        assert!(!result.is_healthy());
        assert_eq!(result.message(), Some("cluster ping failed"));
        assert_eq!(result.error(), Some("cluster driver error: all nodes down"));
    }

    #[tokio::test]
    async fn test_each_probe_pings_again() {
        let mut client = MockClusterClient::new();
        client.expect_ping().times(2).returning(|| Ok(()));

        let check = ClusterHealthCheck::new(Arc::new(client));
        check.check().await;
        check.check().await;
    }

    struct SlowClient;

    #[async_trait]
    impl ClusterClient for SlowClient {
        fn node_count(&self) -> usize {
            1
        }

        async fn start(&self) -> BundleResult<()> {
            Ok(())
        }

        async fn shutdown(&self) -> BundleResult<()> {
            Ok(())
        }

        fn cleanup(&self) -> BundleResult<()> {
            Ok(())
        }

        async fn ping(&self) -> BundleResult<()> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unhealthy_when_ping_times_out() {
        let check = ClusterHealthCheck::new(Arc::new(SlowClient));
        let result = check.check().await;
        assert!(!result.is_healthy());
        assert_eq!(result.message(), Some("cluster ping timed out after 1s"));
        assert_eq!(result.error(), Some("deadline has elapsed"));
    }

    #[test]
    fn test_result_serialization() {
        let json = serde_json::to_value(HealthCheckResult::unhealthy("down")).unwrap();
        assert_eq!(json, serde_json::json!({ "healthy": false, "message": "down" }));
    }
}
