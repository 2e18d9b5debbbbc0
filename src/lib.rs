//! # Prax Cluster
//!
//! Lifecycle integration for distributed database clients.
//!
//! Prax Cluster provides:
//! - Validated cluster configuration with defaults, loaded from TOML or a builder
//! - One memoized client per configuration, built without touching the network
//! - Managed start and bounded graceful stop wired into the host lifecycle
//! - A health check that pings the cluster on every probe
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use prax_cluster::prelude::*;
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
//! #[tokio::main]
//! async fn main() -> BundleResult<()> {
//!     let config = ClusterConfig::from_file("cluster.toml")?;
//!     let app = App { cluster: ClusterFactory::new(config, ScyllaDriver::new())? };
//!
//!     let mut env = ManagedEnvironment::new();
//!     ClusterBundle::<ScyllaDriver>::new().run(&app, &mut env)?;
//!
//!     env.start().await?;
//!     // ... serve traffic ...
//!     env.stop().await
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Configuration, client construction and lifecycle wiring.
pub mod bundle {
    pub use prax_bundle::*;
}

/// ScyllaDB driver.
#[cfg(feature = "scylladb")]
pub mod scylladb {
    pub use prax_scylladb::*;
}

/// Axum host integration.
#[cfg(feature = "axum")]
pub mod axum {
    pub use prax_axum::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use prax_bundle::prelude::*;

    #[cfg(feature = "scylladb")]
    pub use prax_scylladb::{ScyllaCluster, ScyllaDriver};

    #[cfg(feature = "axum")]
    pub use prax_axum::{Cluster, ClusterLayer, health_router, serve};
}

// Re-export key types at the crate root
pub use prax_bundle::{
    BundleError, BundleResult, ClusterBundle, ClusterConfig, ClusterFactory, ManagedEnvironment,
};
