//! Node descriptors handed to a cluster driver.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{ClusterConfig, NodeAddress};
use crate::error::BundleResult;
use crate::tls::{CertificateStore, KEY_STORE_ALIAS, TRUST_STORE_ALIAS};

/// Settings shared by every node of a cluster.
#[derive(Debug, Clone)]
pub struct NodeSettings {
    /// Minimum connections per node.
    pub min_connections: u32,
    /// Maximum connections per node (0 = unlimited).
    pub max_connections: u32,
    /// Connect timeout, `None` for no timeout.
    pub connection_timeout: Option<Duration>,
    /// Idle timeout for pooled connections.
    pub idle_timeout: Duration,
    /// Block on pool exhaustion instead of failing.
    pub block_on_max_connections: bool,
    /// Username for authentication.
    pub username: Option<String>,
    /// Password for authentication.
    pub password: Option<String>,
    /// Client certificate store.
    pub key_store: Option<CertificateStore>,
    /// CA certificate store.
    pub trust_store: Option<CertificateStore>,
}

impl NodeSettings {
    /// Derive node settings from a configuration, loading any TLS stores.
    pub fn from_config(config: &ClusterConfig) -> BundleResult<Self> {
        let key_store = CertificateStore::load(
            config.key_store_type(),
            KEY_STORE_ALIAS,
            config.key_store_path(),
            config.key_store_password(),
        )?;
        let trust_store = CertificateStore::load(
            config.trust_store_type(),
            TRUST_STORE_ALIAS,
            config.trust_store_path(),
            config.trust_store_password(),
        )?;

        Ok(Self {
            min_connections: config.min_connections(),
            max_connections: config.max_connections(),
            connection_timeout: config.connection_timeout(),
            idle_timeout: config.idle_timeout(),
            block_on_max_connections: config.block_on_max_connections(),
            username: config.username().map(str::to_string),
            password: config.password().map(str::to_string),
            key_store,
            trust_store,
        })
    }

    /// Whether any TLS material is configured.
    #[must_use]
    pub fn uses_tls(&self) -> bool {
        self.key_store.is_some() || self.trust_store.is_some()
    }
}

/// One cluster node with its connection settings.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    address: NodeAddress,
    settings: Arc<NodeSettings>,
}

impl NodeDescriptor {
    /// Create a descriptor.
    pub fn new(address: NodeAddress, settings: Arc<NodeSettings>) -> Self {
        Self { address, settings }
    }

    /// Node address.
    #[must_use]
    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    /// `host:port` form, using `default_port` when none was configured.
    #[must_use]
    pub fn endpoint(&self, default_port: u16) -> String {
        NodeAddress::new(self.address.host(), Some(self.address.port_or(default_port)))
            .to_string()
    }

    /// Connection settings.
    #[must_use]
    pub fn settings(&self) -> &NodeSettings {
        &self.settings
    }
}

/// Everything a driver needs to assemble a cluster client.
#[derive(Debug, Clone)]
pub struct ClusterSpec {
    nodes: Vec<NodeDescriptor>,
    execution_attempts: u32,
}

impl ClusterSpec {
    /// Build one descriptor per configured node, all sharing the same settings.
    pub fn from_config(config: &ClusterConfig) -> BundleResult<Self> {
        let settings = Arc::new(NodeSettings::from_config(config)?);
        let nodes = config
            .nodes()
            .iter()
            .map(|address| NodeDescriptor::new(address.clone(), Arc::clone(&settings)))
            .collect();

        Ok(Self {
            nodes,
            execution_attempts: config.execution_attempts(),
        })
    }

    /// Node descriptors, in configuration order.
    #[must_use]
    pub fn nodes(&self) -> &[NodeDescriptor] {
        &self.nodes
    }

    /// Attempts per request.
    #[must_use]
    pub fn execution_attempts(&self) -> u32 {
        self.execution_attempts
    }

    /// Settings shared by every node, if any node exists.
    #[must_use]
    pub fn settings(&self) -> Option<&NodeSettings> {
        self.nodes.first().map(NodeDescriptor::settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreType;
    use crate::error::BundleError;

    #[test]
    fn test_spec_applies_settings_uniformly() {
        let config = ClusterConfig::builder()
            .nodes(["db1:8087", "db2", "[::1]"])
            .credentials("app", "secret")
            .min_connections(2)
            .max_connections(8)
            .block_on_max_connections(true)
            .connection_timeout(Duration::from_millis(1500))
            .execution_attempts(4)
            .build()
            .unwrap();

        let spec = ClusterSpec::from_config(&config).unwrap();
        assert_eq!(spec.nodes().len(), 3);
        assert_eq!(spec.execution_attempts(), 4);
        for node in spec.nodes() {
            let settings = node.settings();
            assert_eq!(settings.min_connections, 2);
            assert_eq!(settings.max_connections, 8);
            assert!(settings.block_on_max_connections);
            assert_eq!(settings.connection_timeout, Some(Duration::from_millis(1500)));
            assert_eq!(settings.username.as_deref(), Some("app"));
            assert!(!settings.uses_tls());
        }
    }

    #[test]
    fn test_endpoint_uses_default_port() {
        let config = ClusterConfig::builder()
            .nodes(["db1:8087", "db2", "[::1]"])
            .build()
            .unwrap();
        let spec = ClusterSpec::from_config(&config).unwrap();
        let endpoints: Vec<_> = spec.nodes().iter().map(|n| n.endpoint(9042)).collect();
        assert_eq!(endpoints, ["db1:8087", "db2:9042", "[::1]:9042"]);
    }

    #[test]
    fn test_missing_trust_store_fails_build() {
        let config = ClusterConfig::builder()
            .nodes(["db1"])
            .trust_store(StoreType::Jks, "/does/not/exist.crt", "changeit")
            .build()
            .unwrap();
        let err = ClusterSpec::from_config(&config).unwrap_err();
        assert!(matches!(err, BundleError::Io { .. }));
    }
}
