//! Axum host for `prax-bundle`.
//!
//! Runs a [`ManagedEnvironment`] inside an [Axum](https://github.com/tokio-rs/axum)
//! server: managed objects start before the listener accepts requests and stop
//! after it drains, health checks are served over HTTP, and handlers reach the
//! cluster client through an extractor.
//!
//! # Features
//!
//! - **Health endpoint**: `GET /healthcheck` runs every registered check
//! - **Extractor**: [`Cluster<C>`] hands the cluster client to handlers
//! - **Middleware**: [`ClusterLayer`] makes the client available to the extractor
//! - **Lifecycle**: [`serve`] starts and stops the environment around the server
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use axum::{Router, routing::get};
//! use prax_axum::{Cluster, ClusterLayer, health_router, serve};
//! use prax_bundle::prelude::*;
//! use prax_scylladb::{ScyllaCluster, ScyllaDriver};
//!
//! struct App {
//!     cluster: ClusterFactory<ScyllaDriver>,
//! }
//!
//! impl ClusterConfiguration<ScyllaDriver> for App {
//!     fn cluster_factory(&self) -> &ClusterFactory<ScyllaDriver> {
//!         &self.cluster
//!     }
//! }
//!
//! async fn nodes(Cluster(cluster): Cluster<ScyllaCluster>) -> String {
//!     format!("{} nodes", cluster.node_count())
//! }
//!
//! #[tokio::main]
//! async fn main() -> prax_axum::Result<()> {
//!     let config = ClusterConfig::from_file("cluster.toml")?;
//!     let app = App { cluster: ClusterFactory::new(config, ScyllaDriver::new())? };
//!
//!     let mut env = ManagedEnvironment::new();
//!     ClusterBundle::<ScyllaDriver>::new().run(&app, &mut env)?;
//!     let env = Arc::new(env);
//!
//!     let router = Router::new()
//!         .route("/nodes", get(nodes))
//!         .layer(ClusterLayer::new(app.cluster.build()?))
//!         .merge(health_router(Arc::clone(&env)));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     serve(listener, router, env, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! }
//! ```

use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{Request, StatusCode, request::Parts},
    response::IntoResponse,
    routing::get,
};
use prax_bundle::{BundleError, ClusterClient, ManagedEnvironment};
use thiserror::Error;
use tokio::net::TcpListener;
use tower::{Layer, Service};
use tracing::{debug, info, warn};

/// Path the health endpoint is served on.
pub const HEALTHCHECK_PATH: &str = "/healthcheck";

/// Errors that can occur during Prax-Axum integration.
#[derive(Error, Debug)]
pub enum PraxAxumError {
    /// The bundle failed to build, start or stop.
    #[error(transparent)]
    Bundle(#[from] BundleError),

    /// The server failed to bind or serve.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),

    /// No cluster client was installed for this route.
    #[error("cluster client is not available")]
    ClientUnavailable,
}

impl IntoResponse for PraxAxumError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            PraxAxumError::Bundle(_) | PraxAxumError::ClientUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            PraxAxumError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Result type for Prax-Axum operations.
pub type Result<T> = std::result::Result<T, PraxAxumError>;

/// Router serving [`HEALTHCHECK_PATH`] for `environment`.
///
/// Responds 200 when every check is healthy and 500 otherwise, with a JSON
/// body keyed by check name.
pub fn health_router(environment: Arc<ManagedEnvironment>) -> Router {
    Router::new()
        .route(HEALTHCHECK_PATH, get(healthcheck))
        .with_state(environment)
}

async fn healthcheck(State(environment): State<Arc<ManagedEnvironment>>) -> impl IntoResponse {
    let report = environment.run_health_checks().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        warn!(checks = report.results().len(), "Health check failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(report.to_json()))
}

/// Start `environment`, serve `router` until `shutdown` resolves, then stop
/// `environment`.
///
/// The environment is stopped even when the server fails; the server error
/// wins over a stop error.
pub async fn serve<F>(
    listener: TcpListener,
    router: Router,
    environment: Arc<ManagedEnvironment>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    environment.start().await?;
    info!(addr = ?listener.local_addr().ok(), "Serving");

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await;

    let stopped = environment.stop().await;
    info!("Server stopped");

    served?;
    stopped?;
    Ok(())
}

/// Tower layer that makes a cluster client available to [`Cluster`].
pub struct ClusterLayer<C> {
    client: Arc<C>,
}

impl<C: ClusterClient> ClusterLayer<C> {
    /// Create a new cluster layer.
    pub fn new(client: Arc<C>) -> Self {
        debug!(nodes = client.node_count(), "ClusterLayer created");
        Self { client }
    }

    /// Get the underlying client.
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }
}

impl<C> Clone for ClusterLayer<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl<S, C> Layer<S> for ClusterLayer<C> {
    type Service = ClusterMiddleware<S, C>;

    fn layer(&self, inner: S) -> Self::Service {
        ClusterMiddleware {
            inner,
            client: Arc::clone(&self.client),
        }
    }
}

/// Tower middleware service installed by [`ClusterLayer`].
pub struct ClusterMiddleware<S, C> {
    inner: S,
    client: Arc<C>,
}

impl<S: Clone, C> Clone for ClusterMiddleware<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            client: Arc::clone(&self.client),
        }
    }
}

impl<S, C, ReqBody> Service<Request<ReqBody>> for ClusterMiddleware<S, C>
where
    S: Service<Request<ReqBody>>,
    C: ClusterClient,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        request
            .extensions_mut()
            .insert(Cluster(Arc::clone(&self.client)));
        self.inner.call(request)
    }
}

/// Extractor for the cluster client installed by [`ClusterLayer`].
///
/// ```rust,ignore
/// async fn handler(Cluster(cluster): Cluster<ScyllaCluster>) -> String {
///     format!("{} nodes", cluster.node_count())
/// }
/// ```
#[derive(Debug)]
pub struct Cluster<C>(pub Arc<C>);

impl<C> Clone for Cluster<C> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<C> Deref for Cluster<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.0
    }
}

impl<S, C> FromRequestParts<S> for Cluster<C>
where
    S: Send + Sync,
    C: ClusterClient,
{
    type Rejection = PraxAxumError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(PraxAxumError::ClientUnavailable)
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        Cluster, ClusterLayer, ClusterMiddleware, HEALTHCHECK_PATH, PraxAxumError, Result,
        health_router, serve,
    };
    pub use prax_bundle::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use prax_bundle::{BundleResult, ClusterHealthCheck, Environment};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    #[derive(Default)]
    struct FakeCluster {
        down: AtomicBool,
    }

    #[async_trait]
    impl ClusterClient for FakeCluster {
        fn node_count(&self) -> usize {
            3
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
            if self.down.load(Ordering::SeqCst) {
                Err(BundleError::driver("all nodes down"))
            } else {
                Ok(())
            }
        }
    }

    fn environment(cluster: &Arc<FakeCluster>) -> Arc<ManagedEnvironment> {
        let mut env = ManagedEnvironment::new();
        env.register_health_check("fake", Arc::new(ClusterHealthCheck::new(Arc::clone(cluster))));
        Arc::new(env)
    }

    async fn send(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_healthcheck_ok() {
        let cluster = Arc::new(FakeCluster::default());
        let (status, body) = send(health_router(environment(&cluster)), HEALTHCHECK_PATH).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"fake":{"healthy":true}}"#);
    }

    #[tokio::test]
    async fn test_healthcheck_unhealthy_is_500() {
        let cluster = Arc::new(FakeCluster::default());
        cluster.down.store(true, Ordering::SeqCst);
        let (status, body) = send(health_router(environment(&cluster)), HEALTHCHECK_PATH).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("all nodes down"));
    }

    #[tokio::test]
    async fn test_extractor_reads_layer_client() {
        async fn nodes(cluster: Cluster<FakeCluster>) -> String {
            cluster.node_count().to_string()
        }

        let router = Router::new()
            .route("/nodes", axum::routing::get(nodes))
            .layer(ClusterLayer::new(Arc::new(FakeCluster::default())));
        let (status, body) = send(router, "/nodes").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "3");
    }

    #[tokio::test]
    async fn test_extractor_without_layer_is_503() {
        async fn nodes(Cluster(cluster): Cluster<FakeCluster>) -> String {
            cluster.node_count().to_string()
        }

        let router = Router::new().route("/nodes", axum::routing::get(nodes));
        let (status, _) = send(router, "/nodes").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_error_status() {
        let response = PraxAxumError::from(BundleError::driver("x")).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
