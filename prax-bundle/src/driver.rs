//! The seam between the bundle and a concrete database client library.
//!
//! A [`ClusterDriver`] turns a [`ClusterSpec`] into a [`ClusterClient`]. The
//! client owns every protocol, pooling and retry concern; the bundle only
//! starts it, stops it and pings it.

use async_trait::async_trait;

use crate::error::BundleResult;
use crate::node::ClusterSpec;

/// A cluster client assembled by a driver.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync + 'static {
    /// Number of nodes the client was assembled from.
    fn node_count(&self) -> usize;

    /// Open connections to the cluster.
    async fn start(&self) -> BundleResult<()>;

    /// Request a graceful shutdown of every connection.
    async fn shutdown(&self) -> BundleResult<()>;

    /// Release whatever the client still holds after shutdown.
    fn cleanup(&self) -> BundleResult<()>;

    /// Issue a trivial request against the cluster.
    async fn ping(&self) -> BundleResult<()>;
}

/// Builds cluster clients for one database client library.
pub trait ClusterDriver: Send + Sync + 'static {
    /// Name the client's health check is registered under.
    const NAME: &'static str;

    /// Port used for nodes configured without one.
    const DEFAULT_PORT: u16;

    /// Client type this driver produces.
    type Client: ClusterClient;

    /// Assemble a client from node descriptors.
    ///
    /// Must not open network connections; that happens in
    /// [`ClusterClient::start`].
    fn build_cluster(&self, spec: ClusterSpec) -> BundleResult<Self::Client>;
}
