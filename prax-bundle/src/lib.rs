//! # prax-bundle
//!
//! Lifecycle integration for distributed database clients.
//!
//! A bundle takes a validated [`ClusterConfig`], builds one cluster client
//! through a [`ClusterDriver`], hands the client's start and stop to the host
//! lifecycle and registers a health check that pings the cluster.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use prax_bundle::prelude::*;
//! use prax_scylladb::ScyllaDriver;
//!
//! struct AppConfig {
//!     cluster: ClusterFactory<ScyllaDriver>,
//! }
//!
//! impl ClusterConfiguration<ScyllaDriver> for AppConfig {
//!     fn cluster_factory(&self) -> &ClusterFactory<ScyllaDriver> {
//!         &self.cluster
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> BundleResult<()> {
//!     let config = ClusterConfig::from_file("cluster.toml")?;
//!     let app = AppConfig {
//!         cluster: ClusterFactory::new(config, ScyllaDriver::new())?,
//!     };
//!
//!     let mut env = ManagedEnvironment::new();
//!     ClusterBundle::<ScyllaDriver>::new().run(&app, &mut env)?;
//!
//!     env.start().await?;
//!     let report = env.run_health_checks().await;
//!     assert!(report.is_healthy());
//!     env.stop().await
//! }
//! ```
//!
//! ## Configuration
//!
//! ```toml
//! nodes = ["db1:9042", "db2", "[::1]:9042"]
//! username = "app"
//! password = "${DB_PASSWORD}"
//! trust_store_type = "PEM"
//! trust_store_path = "/etc/db/ca.pem"
//! trust_store_password = "changeit"
//! min_connections = 2
//! max_connections = 16
//! execution_attempts = 3
//! idle_timeout = "1s"
//! connection_timeout = "5s"
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod bundle;
pub mod config;
pub mod driver;
pub mod environment;
pub mod error;
pub mod factory;
pub mod health;
pub mod logging;
pub mod managed;
pub mod node;
pub mod tls;

pub use bundle::{ClusterBundle, ClusterConfiguration, ConfiguredBundle};
pub use config::{ClusterConfig, ClusterConfigBuilder, NodeAddress, StoreType};
pub use driver::{ClusterClient, ClusterDriver};
pub use environment::{
    Environment, HealthCheckRegistry, HealthReport, LifecycleEnvironment, ManagedEnvironment,
};
pub use error::{BundleError, BundleResult};
pub use factory::ClusterFactory;
pub use health::{ClusterHealthCheck, HealthCheck, HealthCheckResult};
pub use managed::{ClientManager, Managed};
pub use node::{ClusterSpec, NodeDescriptor, NodeSettings};
pub use tls::{CertificateStore, StoreMaterial};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bundle::{ClusterBundle, ClusterConfiguration, ConfiguredBundle};
    pub use crate::config::{ClusterConfig, NodeAddress, StoreType};
    pub use crate::driver::{ClusterClient, ClusterDriver};
    pub use crate::environment::{Environment, ManagedEnvironment};
    pub use crate::error::{BundleError, BundleResult};
    pub use crate::factory::ClusterFactory;
    pub use crate::health::{HealthCheck, HealthCheckResult};
    pub use crate::managed::Managed;
}
