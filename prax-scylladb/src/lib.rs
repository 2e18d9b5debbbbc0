//! # prax-scylladb
//!
//! ScyllaDB cluster driver for `prax-bundle`, built on the official `scylla`
//! async driver.
//!
//! ## Features
//!
//! - **Deferred connect**: building a client opens nothing; the session is
//!   created when the host starts the bundle
//! - **Per-host pooling**: `min_connections` sizes the driver's per-host pool
//! - **Bounded retries**: `execution_attempts` caps how often a request is tried
//! - **TLS**: with the `ssl` feature, key and trust stores become an OpenSSL
//!   context (PKCS#12 archives are decrypted with their store password)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use prax_bundle::{ClusterClient, ClusterConfig, ClusterFactory};
//! use prax_scylladb::ScyllaDriver;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClusterConfig::builder()
//!         .nodes(["node1:9042", "node2:9042", "node3"])
//!         .credentials("admin", "secret")
//!         .build()?;
//!
//!     let factory = ClusterFactory::new(config, ScyllaDriver::new())?;
//!     let cluster = factory.build()?;
//!
//!     cluster.start().await?;
//!     if let Some(session) = cluster.session() {
//!         session.query_unpaged("SELECT release_version FROM system.local", &[]).await?;
//!     }
//!     cluster.shutdown().await?;
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod cluster;
mod driver;
mod error;
mod retry;
#[cfg(feature = "ssl")]
mod tls;

pub use cluster::{PING_QUERY, ScyllaCluster};
pub use driver::ScyllaDriver;
pub use error::{ScyllaError, ScyllaResult};
pub use retry::{ExecutionAttemptsRetryPolicy, ExecutionAttemptsRetrySession};
#[cfg(feature = "ssl")]
pub use tls::ssl_context;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::cluster::ScyllaCluster;
    pub use crate::driver::ScyllaDriver;
    pub use crate::error::{ScyllaError, ScyllaResult};
}
