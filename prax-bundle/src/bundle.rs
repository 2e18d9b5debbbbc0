//! Bundle wiring: build the client, hand it to the lifecycle, register its probe.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::info;

use crate::driver::{ClusterClient, ClusterDriver};
use crate::environment::Environment;
use crate::error::BundleResult;
use crate::factory::ClusterFactory;
use crate::health::ClusterHealthCheck;
use crate::managed::ClientManager;

/// Application configuration that carries a cluster factory.
pub trait ClusterConfiguration<D: ClusterDriver> {
    /// The factory the bundle builds from.
    fn cluster_factory(&self) -> &ClusterFactory<D>;
}

/// A reusable piece of host setup that runs against application configuration.
pub trait ConfiguredBundle<C> {
    /// Wire this bundle into `environment`.
    fn run(&self, configuration: &C, environment: &mut dyn Environment) -> BundleResult<()>;
}

/// Registers a cluster client and its health check with the host.
///
/// The client is managed by a [`ClientManager`] and probed by a
/// [`ClusterHealthCheck`] registered under the driver's name.
pub struct ClusterBundle<D> {
    _driver: PhantomData<fn() -> D>,
}

impl<D: ClusterDriver> ClusterBundle<D> {
    /// Create the bundle.
    pub fn new() -> Self {
        Self {
            _driver: PhantomData,
        }
    }
}

impl<D: ClusterDriver> Default for ClusterBundle<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> fmt::Debug for ClusterBundle<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterBundle").finish()
    }
}

impl<C, D> ConfiguredBundle<C> for ClusterBundle<D>
where
    C: ClusterConfiguration<D>,
    D: ClusterDriver,
{
    fn run(&self, configuration: &C, environment: &mut dyn Environment) -> BundleResult<()> {
        crate::logging::init();

        let client = configuration.cluster_factory().build()?;
        let nodes = client.node_count();

        environment.manage(Arc::new(ClientManager::new(Arc::clone(&client))));
        environment.register_health_check(D::NAME, Arc::new(ClusterHealthCheck::new(client)));

        info!(driver = D::NAME, nodes, "Cluster bundle registered");
        Ok(())
    }
}
