//! [`ClusterDriver`] implementation over the `scylla` crate.

use std::num::NonZeroUsize;

use prax_bundle::{BundleResult, ClusterDriver, ClusterSpec, NodeSettings};
use tracing::debug;

use crate::cluster::{ScyllaCluster, SessionSettings};
use crate::error::{ScyllaError, ScyllaResult};

/// Builds [`ScyllaCluster`] clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScyllaDriver;

impl ScyllaDriver {
    /// Create the driver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn session_settings(spec: &ClusterSpec) -> ScyllaResult<SessionSettings> {
        let settings = spec
            .settings()
            .ok_or_else(|| ScyllaError::config("at least one node is required"))?;

        log_unsupported(settings);

        let connections_per_host = usize::try_from(settings.min_connections)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| ScyllaError::config("min_connections must be at least 1"))?;

        let credentials = settings.username.clone().zip(settings.password.clone());

        Ok(SessionSettings {
            endpoints: spec
                .nodes()
                .iter()
                .map(|node| node.endpoint(Self::DEFAULT_PORT))
                .collect(),
            connections_per_host,
            connection_timeout: settings.connection_timeout,
            credentials,
            execution_attempts: spec.execution_attempts(),
            #[cfg(feature = "ssl")]
            ssl_context: crate::tls::ssl_context(settings)?,
        })
    }
}

impl ClusterDriver for ScyllaDriver {
    const NAME: &'static str = "scylla";
    const DEFAULT_PORT: u16 = 9042;
    type Client = ScyllaCluster;

    fn build_cluster(&self, spec: ClusterSpec) -> BundleResult<ScyllaCluster> {
        #[cfg(not(feature = "ssl"))]
        if spec.settings().is_some_and(NodeSettings::uses_tls) {
            return Err(ScyllaError::Tls(
                "key or trust store configured but the `ssl` feature is disabled".into(),
            )
            .into());
        }

        Ok(ScyllaCluster::new(Self::session_settings(&spec)?))
    }
}

/// The session pools a fixed number of connections per host and manages idle
/// connections itself, so these settings have no counterpart.
fn log_unsupported(settings: &NodeSettings) {
    if settings.max_connections > settings.min_connections {
        debug!(
            max_connections = settings.max_connections,
            "Per-host pool is fixed at min_connections; max_connections ignored"
        );
    }
    if settings.block_on_max_connections {
        debug!("block_on_max_connections ignored; requests queue on the per-host pool");
    }
    debug!(idle_timeout = ?settings.idle_timeout, "idle_timeout is managed by the driver");
}

#[cfg(test)]
mod tests {
    use super::*;
    use prax_bundle::{BundleError, ClusterClient, ClusterConfig, ClusterFactory};
    use std::time::Duration;

    fn factory(nodes: &[&str]) -> ClusterFactory<ScyllaDriver> {
        let config = ClusterConfig::builder()
            .nodes(nodes.iter().copied())
            .build()
            .unwrap();
        ClusterFactory::new(config, ScyllaDriver::new()).unwrap()
    }

    #[test]
    fn test_build_single_node_without_connecting() {
        let cluster = factory(&["127.0.0.1"]).build().unwrap();
        assert_eq!(cluster.node_count(), 1);
        assert_eq!(cluster.endpoints(), ["127.0.0.1:9042"]);
        assert!(!cluster.is_started());
    }

    #[test]
    fn test_endpoints_keep_explicit_ports() {
        let cluster = factory(&["db1:19042", "db2", "[::1]"]).build().unwrap();
        assert_eq!(cluster.endpoints(), ["db1:19042", "db2:9042", "[::1]:9042"]);
    }

    #[test]
    fn test_session_builder_carries_nodes() {
        let cluster = factory(&["db1", "db2"]).build().unwrap();
        let builder = cluster.session_builder();
        assert_eq!(builder.config.known_nodes.len(), 2);
    }

    #[test]
    fn test_pool_size_from_min_connections() {
        let config = ClusterConfig::builder()
            .nodes(["db1"])
            .min_connections(4)
            .max_connections(16)
            .connection_timeout(Duration::from_secs(2))
            .credentials("app", "secret")
            .build()
            .unwrap();
        let spec = ClusterSpec::from_config(&config).unwrap();
        let settings = ScyllaDriver::session_settings(&spec).unwrap();

        assert_eq!(settings.connections_per_host.get(), 4);
        assert_eq!(settings.connection_timeout, Some(Duration::from_secs(2)));
        assert_eq!(
            settings.credentials,
            Some(("app".to_string(), "secret".to_string()))
        );
    }

    #[tokio::test]
    async fn test_ping_before_start_is_error() {
        let cluster = factory(&["127.0.0.1"]).build().unwrap();
        let err = cluster.ping().await.unwrap_err();
        assert!(matches!(err, BundleError::Driver(_)));
    }

    #[tokio::test]
    async fn test_stop_without_start_is_clean() {
        let cluster = factory(&["127.0.0.1"]).build().unwrap();
        cluster.shutdown().await.unwrap();
        cluster.cleanup().unwrap();
        assert!(!cluster.is_started());
    }

    #[cfg(not(feature = "ssl"))]
    #[test]
    fn test_tls_requires_ssl_feature() {
        let config = ClusterConfig::builder()
            .nodes(["db1"])
            .trust_store_type(prax_bundle::StoreType::Platform("system".into()))
            .build()
            .unwrap();
        let factory = ClusterFactory::new(config, ScyllaDriver::new()).unwrap();
        assert!(matches!(factory.build(), Err(BundleError::Driver(_))));
    }
}
