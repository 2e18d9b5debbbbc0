//! Lifecycle adapter between a cluster client and the host.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::driver::ClusterClient;
use crate::error::{BundleError, BundleResult};

/// How long [`ClientManager::stop`] waits for a graceful shutdown.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// An object whose start and stop the host drives.
#[async_trait]
pub trait Managed: Send + Sync {
    /// Called when the host starts.
    async fn start(&self) -> BundleResult<()>;

    /// Called when the host stops.
    async fn stop(&self) -> BundleResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum ManagerState {
    New = 0,
    Started = 1,
    Stopped = 2,
}

impl From<u8> for ManagerState {
    fn from(v: u8) -> Self {
        match v {
            1 => Self::Started,
            2 => Self::Stopped,
            _ => Self::New,
        }
    }
}

/// Starts and stops one cluster client on behalf of the host.
///
/// Once stopped the manager is finished: a later start is rejected and a
/// later stop does nothing.
pub struct ClientManager<C: ClusterClient> {
    client: Arc<C>,
    state: AtomicU8,
    stop_timeout: Duration,
}

impl<C: ClusterClient> ClientManager<C> {
    /// Manage `client` with the default stop timeout.
    pub fn new(client: Arc<C>) -> Self {
        Self::with_stop_timeout(client, STOP_TIMEOUT)
    }

    /// Manage `client` with a custom stop timeout.
    pub fn with_stop_timeout(client: Arc<C>, stop_timeout: Duration) -> Self {
        Self {
            client,
            state: AtomicU8::new(ManagerState::New as u8),
            stop_timeout,
        }
    }

    /// The managed client.
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Whether `start` has succeeded and `stop` has not run.
    pub fn is_started(&self) -> bool {
        ManagerState::from(self.state.load(Ordering::Acquire)) == ManagerState::Started
    }

    /// Whether `stop` has run.
    pub fn is_stopped(&self) -> bool {
        ManagerState::from(self.state.load(Ordering::Acquire)) == ManagerState::Stopped
    }
}

#[async_trait]
impl<C: ClusterClient> Managed for ClientManager<C> {
    async fn start(&self) -> BundleResult<()> {
        if self.is_stopped() {
            return Err(BundleError::Lifecycle(
                "cannot start a cluster client after it was stopped".into(),
            ));
        }

        self.client.start().await?;
        // A concurrent stop wins; leave its state in place.
        let _ = self.state.compare_exchange(
            ManagerState::New as u8,
            ManagerState::Started as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        info!(nodes = self.client.node_count(), "Cluster client started");
        Ok(())
    }

    async fn stop(&self) -> BundleResult<()> {
        let previous = self.state.swap(ManagerState::Stopped as u8, Ordering::AcqRel);
        if ManagerState::from(previous) == ManagerState::Stopped {
            return Ok(());
        }

        let shutdown = match tokio::time::timeout(self.stop_timeout, self.client.shutdown()).await
        {
            Ok(Ok(())) => None,
            Ok(Err(e)) => {
                warn!(error = %e, "Cluster shutdown failed");
                Some(e)
            }
            Err(_) => {
                warn!(timeout = ?self.stop_timeout, "Cluster shutdown timed out");
                Some(BundleError::ShutdownTimeout(self.stop_timeout))
            }
        };

        self.client.cleanup()?;
        info!("Cluster client stopped");

        match shutdown {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
