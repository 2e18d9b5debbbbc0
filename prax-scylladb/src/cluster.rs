//! ScyllaDB cluster client.
//!
//! The `scylla` session already pools connections per host and reconnects on
//! its own. This client only decides when the session is opened and dropped.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use prax_bundle::{BundleResult, ClusterClient};
use scylla::execution_profile::ExecutionProfile;
use scylla::transport::session::PoolSize;
use scylla::{Session, SessionBuilder};
use tracing::{debug, info};

use crate::error::{ScyllaError, ScyllaResult};
use crate::retry::ExecutionAttemptsRetryPolicy;

/// Query used to probe the cluster.
pub const PING_QUERY: &str = "SELECT now() FROM system.local";

/// Connection settings resolved from the node descriptors.
#[derive(Debug, Clone)]
pub(crate) struct SessionSettings {
    pub endpoints: Vec<String>,
    pub connections_per_host: NonZeroUsize,
    pub connection_timeout: Option<Duration>,
    pub credentials: Option<(String, String)>,
    pub execution_attempts: u32,
    #[cfg(feature = "ssl")]
    pub ssl_context: Option<openssl::ssl::SslContext>,
}

/// A ScyllaDB cluster assembled from node descriptors.
///
/// No connection is opened until [`ClusterClient::start`].
pub struct ScyllaCluster {
    settings: SessionSettings,
    session: RwLock<Option<Arc<Session>>>,
}

impl ScyllaCluster {
    pub(crate) fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            session: RwLock::new(None),
        }
    }

    /// Contact points, as `host:port`.
    #[must_use]
    pub fn endpoints(&self) -> &[String] {
        &self.settings.endpoints
    }

    /// The open session, if started.
    #[must_use]
    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.read().clone()
    }

    /// Whether a session is open.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.session.read().is_some()
    }

    /// Session builder carrying every configured setting.
    #[must_use]
    pub fn session_builder(&self) -> SessionBuilder {
        let settings = &self.settings;

        let profile = ExecutionProfile::builder()
            .retry_policy(Box::new(ExecutionAttemptsRetryPolicy::new(
                settings.execution_attempts,
            )))
            .build();

        let mut builder = SessionBuilder::new()
            .known_nodes(&settings.endpoints)
            .pool_size(PoolSize::PerHost(settings.connections_per_host))
            .default_execution_profile_handle(profile.into_handle());

        if let Some(timeout) = settings.connection_timeout {
            builder = builder.connection_timeout(timeout);
        }

        if let Some((username, password)) = &settings.credentials {
            builder = builder.user(username, password);
        }

        #[cfg(feature = "ssl")]
        {
            builder = builder.ssl_context(settings.ssl_context.clone());
        }

        builder
    }

    async fn open(&self) -> ScyllaResult<()> {
        if self.is_started() {
            debug!("Session already open");
            return Ok(());
        }

        let session = self.session_builder().build().await?;
        *self.session.write() = Some(Arc::new(session));
        info!(nodes = self.settings.endpoints.len(), "ScyllaDB session opened");
        Ok(())
    }

    async fn probe(&self) -> ScyllaResult<()> {
        let session = self.session().ok_or(ScyllaError::NotStarted)?;
        session.query_unpaged(PING_QUERY, &[]).await?;
        Ok(())
    }
}

#[async_trait]
impl ClusterClient for ScyllaCluster {
    fn node_count(&self) -> usize {
        self.settings.endpoints.len()
    }

    async fn start(&self) -> BundleResult<()> {
        Ok(self.open().await?)
    }

    async fn shutdown(&self) -> BundleResult<()> {
        let session = self.session.write().take();
        if let Some(session) = session {
            // Other holders keep the connections alive until they drop theirs.
            debug!(
                holders = Arc::strong_count(&session),
                "Dropping ScyllaDB session"
            );
        }
        Ok(())
    }

    fn cleanup(&self) -> BundleResult<()> {
        self.session.write().take();
        Ok(())
    }

    async fn ping(&self) -> BundleResult<()> {
        Ok(self.probe().await?)
    }
}

impl std::fmt::Debug for ScyllaCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScyllaCluster")
            .field("endpoints", &self.settings.endpoints)
            .field("connections_per_host", &self.settings.connections_per_host)
            .field("execution_attempts", &self.settings.execution_attempts)
            .field("started", &self.is_started())
            .finish()
    }
}
