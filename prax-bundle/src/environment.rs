//! Host environment: where managed objects and health checks are registered.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::BundleResult;
use crate::health::{HealthCheck, HealthCheckResult};
use crate::managed::Managed;

/// Registration surface a host exposes to bundles.
pub trait Environment {
    /// Hand a managed object to the host lifecycle.
    fn manage(&mut self, managed: Arc<dyn Managed>);

    /// Register a health check under `name`.
    fn register_health_check(&mut self, name: &str, check: Arc<dyn HealthCheck>);
}

/// Managed objects, started in registration order and stopped in reverse.
#[derive(Default)]
pub struct LifecycleEnvironment {
    managed: Vec<Arc<dyn Managed>>,
}

impl LifecycleEnvironment {
    /// Create an empty lifecycle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a managed object.
    pub fn manage(&mut self, managed: Arc<dyn Managed>) {
        self.managed.push(managed);
    }

    /// Number of managed objects.
    pub fn len(&self) -> usize {
        self.managed.len()
    }

    /// Whether nothing is managed.
    pub fn is_empty(&self) -> bool {
        self.managed.is_empty()
    }

    /// Start every object in order.
    ///
    /// On failure the objects already started are stopped again, in reverse.
    pub async fn start(&self) -> BundleResult<()> {
        for (index, managed) in self.managed.iter().enumerate() {
            if let Err(e) = managed.start().await {
                warn!(index, error = %e, "Managed object failed to start");
                for started in self.managed[..index].iter().rev() {
                    if let Err(stop_err) = started.stop().await {
                        warn!(error = %stop_err, "Managed object failed to stop");
                    }
                }
                return Err(e);
            }
        }
        info!(count = self.managed.len(), "Lifecycle started");
        Ok(())
    }

    /// Stop every object in reverse order.
    ///
    /// Keeps going past failures and returns the first one.
    pub async fn stop(&self) -> BundleResult<()> {
        let mut first_error = None;
        for managed in self.managed.iter().rev() {
            if let Err(e) = managed.stop().await {
                warn!(error = %e, "Managed object failed to stop");
                first_error.get_or_insert(e);
            }
        }
        info!(count = self.managed.len(), "Lifecycle stopped");
        first_error.map_or(Ok(()), Err)
    }
}

/// Results of one run of every registered health check, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HealthReport {
    results: BTreeMap<String, HealthCheckResult>,
}

impl HealthReport {
    /// Whether every check passed.
    pub fn is_healthy(&self) -> bool {
        self.results.values().all(HealthCheckResult::is_healthy)
    }

    /// Result of one check.
    pub fn get(&self, name: &str) -> Option<&HealthCheckResult> {
        self.results.get(name)
    }

    /// Every result, by name.
    pub fn results(&self) -> &BTreeMap<String, HealthCheckResult> {
        &self.results
    }

    /// JSON body for an HTTP health endpoint.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Named health checks.
#[derive(Default)]
pub struct HealthCheckRegistry {
    checks: BTreeMap<String, Arc<dyn HealthCheck>>,
}

impl HealthCheckRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a check; a later registration under the same name replaces it.
    pub fn register(&mut self, name: impl Into<String>, check: Arc<dyn HealthCheck>) {
        let name = name.into();
        if self.checks.insert(name.clone(), check).is_some() {
            warn!(name = %name, "Replacing existing health check");
        } else {
            debug!(name = %name, "Registered health check");
        }
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.checks.keys().map(String::as_str)
    }

    /// Whether a check is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.checks.contains_key(name)
    }

    /// Number of checks.
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Whether no checks are registered.
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Run one check.
    pub async fn run_health_check(&self, name: &str) -> Option<HealthCheckResult> {
        let check = self.checks.get(name)?;
        Some(check.check().await)
    }

    /// Run every check concurrently.
    pub async fn run_health_checks(&self) -> HealthReport {
        let runs = self.checks.iter().map(|(name, check)| async move {
            (name.clone(), check.check().await)
        });
        HealthReport {
            results: join_all(runs).await.into_iter().collect(),
        }
    }
}

/// The default [`Environment`]: a lifecycle plus a health check registry.
#[derive(Default)]
pub struct ManagedEnvironment {
    lifecycle: LifecycleEnvironment,
    health_checks: HealthCheckRegistry,
}

impl ManagedEnvironment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Managed objects.
    pub fn lifecycle(&self) -> &LifecycleEnvironment {
        &self.lifecycle
    }

    /// Health checks.
    pub fn health_checks(&self) -> &HealthCheckRegistry {
        &self.health_checks
    }

    /// Start every managed object.
    pub async fn start(&self) -> BundleResult<()> {
        self.lifecycle.start().await
    }

    /// Stop every managed object.
    pub async fn stop(&self) -> BundleResult<()> {
        self.lifecycle.stop().await
    }

    /// Run every health check.
    pub async fn run_health_checks(&self) -> HealthReport {
        self.health_checks.run_health_checks().await
    }
}

impl Environment for ManagedEnvironment {
    fn manage(&mut self, managed: Arc<dyn Managed>) {
        self.lifecycle.manage(managed);
    }

    fn register_health_check(&mut self, name: &str, check: Arc<dyn HealthCheck>) {
        self.health_checks.register(name, check);
    }
}
