//! Integration tests for cluster configuration parsing and validation.
//!
//! These tests verify that TOML configuration is parsed, defaulted and
//! validated before any client is built.

use std::time::Duration;

use prax_cluster::bundle::{NodeAddress, StoreType};
use prax_cluster::{BundleError, ClusterConfig};

/// Test minimal configuration
#[test]
fn test_config_minimal() {
    let config_str = r#"
        nodes = ["127.0.0.1"]
    "#;

    let config = ClusterConfig::from_str(config_str).expect("Failed to parse config");
    assert_eq!(config.nodes(), [NodeAddress::new("127.0.0.1", None)]);
    assert_eq!(config.min_connections(), 10);
    assert_eq!(config.max_connections(), 0);
    assert_eq!(config.execution_attempts(), 3);
    assert_eq!(config.idle_timeout(), Duration::from_millis(1000));
    assert_eq!(config.connection_timeout(), None);
    assert!(!config.block_on_max_connections());
}

/// Test full configuration with all options
#[test]
fn test_config_full() {
    let config_str = r#"
        nodes = ["db1.internal:8087", "db2.internal", "[2001:db8::1]:9042"]
        username = "app"
        password = "secret"

        key_store_type = "PKCS12"
        key_store_path = "/etc/db/client.p12"
        key_store_password = "changeit"

        trust_store_type = "system"

        min_connections = 4
        max_connections = 32
        execution_attempts = 5
        block_on_max_connections = true
        idle_timeout = "10s"
        connection_timeout = "2s"
    "#;

    let config = ClusterConfig::from_str(config_str).expect("Failed to parse config");

    assert_eq!(config.nodes().len(), 3);
    assert_eq!(config.nodes()[0].port(), Some(8087));
    assert_eq!(config.nodes()[2].host(), "2001:db8::1");
    assert_eq!(config.username(), Some("app"));
    assert_eq!(config.key_store_type(), StoreType::Pkcs12);
    assert!(config.trust_store_type().is_platform());
    assert_eq!(config.max_connections(), 32);
    assert_eq!(config.execution_attempts(), 5);
    assert_eq!(config.idle_timeout(), Duration::from_secs(10));
    assert_eq!(config.connection_timeout(), Some(Duration::from_secs(2)));
}

/// Test environment variable interpolation
#[test]
fn test_config_env_vars() {
    // SAFETY: the variable name is unique to this test.
    unsafe {
        std::env::set_var("PRAX_CLUSTER_IT_PASSWORD", "from-env");
    }

    let config_str = r#"
        nodes = ["db1"]
        username = "app"
        password = "${PRAX_CLUSTER_IT_PASSWORD}"
    "#;

    let config = ClusterConfig::from_str(config_str).expect("Failed to parse config");
    assert_eq!(config.password(), Some("from-env"));
}

/// Test that every violation is reported at once
#[test]
fn test_config_reports_all_violations() {
    let config_str = r#"
        nodes = []
        key_store_type = "JKS"
        min_connections = 0
        execution_attempts = 0
    "#;

    let err = ClusterConfig::from_str(config_str).unwrap_err();
    assert!(matches!(err, BundleError::Validation { .. }));
    assert_eq!(err.violations().len(), 5);
    assert!(err.to_string().contains("nodes must not be empty"));
}

/// Test store type rules
#[test]
fn test_config_store_types() {
    let jks_without_path = r#"
        nodes = ["db1"]
        key_store_type = "JKS"
        key_store_password = "changeit"
    "#;
    assert!(ClusterConfig::from_str(jks_without_path).is_err());

    let platform = r#"
        nodes = ["db1"]
        key_store_type = "Windows-MY"
    "#;
    assert!(ClusterConfig::from_str(platform).is_ok());

    let unknown = r#"
        nodes = ["db1"]
        key_store_type = "BKS"
    "#;
    assert!(matches!(
        ClusterConfig::from_str(unknown),
        Err(BundleError::Parse { .. })
    ));
}

/// Test timeout formats
#[test]
fn test_config_timeouts() {
    let config_str = r#"
        nodes = ["db1"]
        idle_timeout = 250
        connection_timeout = "1 minute"
    "#;

    let config = ClusterConfig::from_str(config_str).expect("Failed to parse config");
    assert_eq!(config.idle_timeout(), Duration::from_millis(250));
    assert_eq!(config.connection_timeout(), Some(Duration::from_secs(60)));

    let invalid = r#"
        nodes = ["db1"]
        idle_timeout = "soon"
    "#;
    assert!(ClusterConfig::from_str(invalid).is_err());
}

/// Test invalid node addresses
#[test]
fn test_config_bad_node() {
    let config_str = r#"
        nodes = ["db1:port"]
    "#;
    assert!(matches!(
        ClusterConfig::from_str(config_str),
        Err(BundleError::Parse { .. })
    ));
}

/// Test loading from a file
#[test]
fn test_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cluster.toml");
    std::fs::write(&path, "nodes = [\"db1\", \"db2\"]\nmin_connections = 2\n").unwrap();

    let config = ClusterConfig::from_file(&path).expect("Failed to load config");
    assert_eq!(config.nodes().len(), 2);
    assert_eq!(config.min_connections(), 2);
}
