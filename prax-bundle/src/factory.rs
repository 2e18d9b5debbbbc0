//! Memoized cluster client construction.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::{debug, info};

use crate::config::ClusterConfig;
use crate::driver::ClusterDriver;
use crate::error::BundleResult;
use crate::node::ClusterSpec;

/// Builds a cluster client from a validated configuration, at most once.
///
/// Every successful [`build`](Self::build) on the same factory returns the
/// same handle. Concurrent first builds may each assemble a client; only the
/// first one stored is kept and the others are dropped.
pub struct ClusterFactory<D: ClusterDriver> {
    config: ClusterConfig,
    driver: D,
    client: OnceLock<Arc<D::Client>>,
}

impl<D: ClusterDriver> ClusterFactory<D> {
    /// Create a factory, rejecting an invalid configuration up front.
    pub fn new(config: ClusterConfig, driver: D) -> BundleResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            driver,
            client: OnceLock::new(),
        })
    }

    /// The configuration this factory builds from.
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// The driver this factory builds with.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Whether a client has already been built.
    pub fn is_built(&self) -> bool {
        self.client.get().is_some()
    }

    /// Build the cluster client, or return the one already built.
    ///
    /// Certificate, I/O and driver failures propagate and leave the factory
    /// unbuilt, so a later call tries again.
    pub fn build(&self) -> BundleResult<Arc<D::Client>> {
        if let Some(client) = self.client.get() {
            return Ok(Arc::clone(client));
        }

        let spec = ClusterSpec::from_config(&self.config)?;
        let node_count = spec.nodes().len();
        let client = Arc::new(self.driver.build_cluster(spec)?);

        match self.client.set(client) {
            Ok(()) => info!(driver = D::NAME, nodes = node_count, "Cluster client built"),
            Err(_) => debug!(driver = D::NAME, "Concurrent build won; discarding this client"),
        }

        self.build()
    }
}

impl<D: ClusterDriver> fmt::Debug for ClusterFactory<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterFactory")
            .field("config", &self.config)
            .field("driver", &D::NAME)
            .field("built", &self.is_built())
            .finish()
    }
}
