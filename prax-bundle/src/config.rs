//! Cluster client configuration.
//!
//! Holds every tunable the bundle hands to the wrapped database client, with
//! defaults, TOML loading and fail-fast validation.

use std::fmt;
use std::net::Ipv6Addr;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use regex_lite::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::{BundleError, BundleResult};

/// Default minimum number of connections per node.
pub const DEFAULT_MIN_CONNECTIONS: u32 = 10;

/// Default maximum number of connections per node (0 = unlimited).
pub const DEFAULT_MAX_CONNECTIONS: u32 = 0;

/// Default number of attempts the wrapped client makes for each request.
pub const DEFAULT_EXECUTION_ATTEMPTS: u32 = 3;

/// Default idle timeout for pooled connections.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default connection timeout (zero = no timeout).
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::ZERO;

/// A cluster node address in host-and-port form.
///
/// The port is optional; nodes without one use the driver's default port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeAddress {
    host: String,
    port: Option<u16>,
}

impl NodeAddress {
    /// Create an address from a host and an optional port.
    pub fn new(host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host name or IP literal, without brackets.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, if one was given.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Port, falling back to `default` when none was given.
    #[must_use]
    pub fn port_or(&self, default: u16) -> u16 {
        self.port.unwrap_or(default)
    }
}

impl FromStr for NodeAddress {
    type Err = BundleError;

    fn from_str(s: &str) -> BundleResult<Self> {
        let input = s.trim();
        if input.is_empty() {
            return Err(BundleError::address(s, "host must not be empty"));
        }

        // [v6]:port or [v6]
        if let Some(rest) = input.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| BundleError::address(s, "missing closing bracket"))?;
            if host.parse::<Ipv6Addr>().is_err() {
                return Err(BundleError::address(s, "bracketed host must be an IPv6 literal"));
            }
            let port = match tail {
                "" => None,
                _ => {
                    let port = tail
                        .strip_prefix(':')
                        .ok_or_else(|| BundleError::address(s, "unexpected text after `]`"))?;
                    Some(parse_port(s, port)?)
                }
            };
            return Ok(Self::new(host, port));
        }

        // A bare IPv6 literal has more than one colon and no port.
        if input.matches(':').count() > 1 {
            if input.parse::<Ipv6Addr>().is_err() {
                return Err(BundleError::address(s, "not a valid IPv6 literal"));
            }
            return Ok(Self::new(input, None));
        }

        match input.split_once(':') {
            Some((host, port)) => {
                if host.is_empty() {
                    return Err(BundleError::address(s, "host must not be empty"));
                }
                Ok(Self::new(host, Some(parse_port(s, port)?)))
            }
            None => Ok(Self::new(input, None)),
        }
    }
}

fn parse_port(address: &str, port: &str) -> BundleResult<u16> {
    port.parse::<u16>()
        .map_err(|_| BundleError::address(address, format!("invalid port `{port}`")))
}

impl TryFrom<String> for NodeAddress {
    type Error = BundleError;

    fn try_from(value: String) -> BundleResult<Self> {
        value.parse()
    }
}

impl From<NodeAddress> for String {
    fn from(address: NodeAddress) -> Self {
        address.to_string()
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bracket = self.host.contains(':');
        match (bracket, self.port) {
            (true, Some(port)) => write!(f, "[{}]:{port}", self.host),
            (true, None) => write!(f, "[{}]", self.host),
            (false, Some(port)) => write!(f, "{}:{port}", self.host),
            (false, None) => f.write_str(&self.host),
        }
    }
}

/// Container format of a key or trust store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StoreType {
    /// PEM-armored certificate (the generic default).
    #[default]
    Pem,
    /// Raw DER certificate.
    Der,
    /// Java-style keystore holding a single certificate entry.
    Jks,
    /// PKCS#12 bundle, decrypted with the store password.
    Pkcs12,
    /// Operating-system certificate store; needs no file or password.
    Platform(String),
}

impl StoreType {
    /// Whether this is a platform store that needs no file or password.
    #[must_use]
    pub fn is_platform(&self) -> bool {
        matches!(self, Self::Platform(_))
    }
}

impl FromStr for StoreType {
    type Err = BundleError;

    fn from_str(s: &str) -> BundleResult<Self> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "pem" => Ok(Self::Pem),
            "der" => Ok(Self::Der),
            "jks" => Ok(Self::Jks),
            "pkcs12" | "p12" | "pfx" => Ok(Self::Pkcs12),
            "platform" | "system" => Ok(Self::Platform(s.trim().to_string())),
            _ if lower.starts_with("windows-") => Ok(Self::Platform(s.trim().to_string())),
            _ => Err(BundleError::validation(vec![format!(
                "unsupported store type `{s}`"
            )])),
        }
    }
}

impl TryFrom<String> for StoreType {
    type Error = BundleError;

    fn try_from(value: String) -> BundleResult<Self> {
        value.parse()
    }
}

impl From<StoreType> for String {
    fn from(store_type: StoreType) -> Self {
        store_type.to_string()
    }
}

impl fmt::Display for StoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pem => f.write_str("PEM"),
            Self::Der => f.write_str("DER"),
            Self::Jks => f.write_str("JKS"),
            Self::Pkcs12 => f.write_str("PKCS12"),
            Self::Platform(name) => f.write_str(name),
        }
    }
}

/// Configuration for a cluster client.
///
/// Loaded from TOML or assembled with [`ClusterConfig::builder`]; both paths
/// validate before returning.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterConfig {
    /// Cluster nodes, in connection order.
    nodes: Vec<NodeAddress>,

    /// Username for authentication.
    username: Option<String>,

    /// Password for authentication.
    password: Option<String>,

    /// Client certificate file.
    key_store_path: Option<String>,

    /// Password protecting the key store.
    key_store_password: Option<String>,

    /// Key store format; unset means the generic default.
    key_store_type: Option<StoreType>,

    /// CA certificate file.
    trust_store_path: Option<String>,

    /// Password protecting the trust store.
    trust_store_password: Option<String>,

    /// Trust store format; unset means the generic default.
    trust_store_type: Option<StoreType>,

    /// Minimum connections per node.
    min_connections: u32,

    /// Maximum connections per node (0 = unlimited).
    max_connections: u32,

    /// Attempts per request before the client gives up.
    execution_attempts: u32,

    /// Block callers when the pool is exhausted instead of failing.
    block_on_max_connections: bool,

    /// How long an idle pooled connection is kept.
    #[serde(with = "duration_format")]
    idle_timeout: Duration,

    /// Connect timeout (zero = no timeout).
    #[serde(with = "duration_format")]
    connection_timeout: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            username: None,
            password: None,
            key_store_path: None,
            key_store_password: None,
            key_store_type: None,
            trust_store_path: None,
            trust_store_password: None,
            trust_store_type: None,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            execution_attempts: DEFAULT_EXECUTION_ATTEMPTS,
            block_on_max_connections: false,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
        }
    }
}

impl ClusterConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ClusterConfigBuilder {
        ClusterConfigBuilder::default()
    }

    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> BundleResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| BundleError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// `${VAR}` and `${VAR:-default}` references are expanded from the
    /// environment before parsing.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> BundleResult<Self> {
        let expanded = expand_env_vars(content);
        let config: Self =
            toml::from_str(&expanded).map_err(|e| BundleError::Parse { source: e })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every constraint and report all violations at once.
    pub fn validate(&self) -> BundleResult<()> {
        let mut violations = Vec::new();

        if self.nodes.is_empty() {
            violations.push("nodes must not be empty".to_string());
        }

        validate_store(
            "key",
            self.key_store_type.as_ref(),
            self.key_store_path.as_deref(),
            self.key_store_password.as_deref(),
            &mut violations,
        );
        validate_store(
            "trust",
            self.trust_store_type.as_ref(),
            self.trust_store_path.as_deref(),
            self.trust_store_password.as_deref(),
            &mut violations,
        );

        if self.username.is_some() != self.password.is_some() {
            violations.push("username and password must be configured together".to_string());
        }

        if self.min_connections < 1 {
            violations.push("min_connections must be at least 1".to_string());
        }
        if self.max_connections > 0 && self.max_connections < self.min_connections {
            violations.push(format!(
                "max_connections ({}) must be 0 or at least min_connections ({})",
                self.max_connections, self.min_connections
            ));
        }
        if self.execution_attempts < 1 {
            violations.push("execution_attempts must be at least 1".to_string());
        }
        if self.idle_timeout < Duration::from_millis(1) {
            violations.push("idle_timeout must be at least 1ms".to_string());
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(BundleError::validation(violations))
        }
    }

    /// Cluster nodes.
    #[must_use]
    pub fn nodes(&self) -> &[NodeAddress] {
        &self.nodes
    }

    /// Username.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Password.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Key store path.
    #[must_use]
    pub fn key_store_path(&self) -> Option<&str> {
        self.key_store_path.as_deref()
    }

    /// Key store password.
    #[must_use]
    pub fn key_store_password(&self) -> Option<&str> {
        self.key_store_password.as_deref()
    }

    /// Effective key store type.
    #[must_use]
    pub fn key_store_type(&self) -> StoreType {
        self.key_store_type.clone().unwrap_or_default()
    }

    /// Trust store path.
    #[must_use]
    pub fn trust_store_path(&self) -> Option<&str> {
        self.trust_store_path.as_deref()
    }

    /// Trust store password.
    #[must_use]
    pub fn trust_store_password(&self) -> Option<&str> {
        self.trust_store_password.as_deref()
    }

    /// Effective trust store type.
    #[must_use]
    pub fn trust_store_type(&self) -> StoreType {
        self.trust_store_type.clone().unwrap_or_default()
    }

    /// Minimum connections per node.
    #[must_use]
    pub fn min_connections(&self) -> u32 {
        self.min_connections
    }

    /// Maximum connections per node (0 = unlimited).
    #[must_use]
    pub fn max_connections(&self) -> u32 {
        self.max_connections
    }

    /// Attempts per request.
    #[must_use]
    pub fn execution_attempts(&self) -> u32 {
        self.execution_attempts
    }

    /// Whether acquisition blocks when the pool is exhausted.
    #[must_use]
    pub fn block_on_max_connections(&self) -> bool {
        self.block_on_max_connections
    }

    /// Idle timeout.
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Connection timeout, `None` when zero (no timeout).
    #[must_use]
    pub fn connection_timeout(&self) -> Option<Duration> {
        (!self.connection_timeout.is_zero()).then_some(self.connection_timeout)
    }
}

impl fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("nodes", &self.nodes)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("key_store_path", &self.key_store_path)
            .field("key_store_type", &self.key_store_type)
            .field("trust_store_path", &self.trust_store_path)
            .field("trust_store_type", &self.trust_store_type)
            .field("min_connections", &self.min_connections)
            .field("max_connections", &self.max_connections)
            .field("execution_attempts", &self.execution_attempts)
            .field("block_on_max_connections", &self.block_on_max_connections)
            .field("idle_timeout", &self.idle_timeout)
            .field("connection_timeout", &self.connection_timeout)
            .finish_non_exhaustive()
    }
}

fn validate_store(
    kind: &str,
    store_type: Option<&StoreType>,
    path: Option<&str>,
    password: Option<&str>,
    violations: &mut Vec<String>,
) {
    // Only a non-default file-backed store makes its material mandatory.
    let Some(store_type) = store_type else {
        return;
    };
    if store_type.is_platform() || *store_type == StoreType::default() {
        return;
    }

    if path.is_none_or(str::is_empty) {
        violations.push(format!(
            "{kind}_store_path is required when {kind}_store_type is {store_type}"
        ));
    }
    if password.is_none_or(str::is_empty) {
        violations.push(format!(
            "{kind}_store_password is required when {kind}_store_type is {store_type}"
        ));
    }
}

/// Builder for [`ClusterConfig`].
#[derive(Debug, Default)]
pub struct ClusterConfigBuilder {
    nodes: Vec<String>,
    config: Option<ClusterConfig>,
}

impl ClusterConfigBuilder {
    fn config(&mut self) -> &mut ClusterConfig {
        self.config.get_or_insert_with(ClusterConfig::default)
    }

    /// Set the cluster nodes.
    #[must_use]
    pub fn nodes<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nodes = nodes.into_iter().map(Into::into).collect();
        self
    }

    /// Add a node.
    #[must_use]
    pub fn add_node<S: Into<String>>(mut self, node: S) -> Self {
        self.nodes.push(node.into());
        self
    }

    /// Set authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        let config = self.config();
        config.username = Some(username.into());
        config.password = Some(password.into());
        self
    }

    /// Set the key store.
    #[must_use]
    pub fn key_store(
        mut self,
        store_type: StoreType,
        path: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let config = self.config();
        config.key_store_type = Some(store_type);
        config.key_store_path = Some(path.into());
        config.key_store_password = Some(password.into());
        self
    }

    /// Set the key store type alone.
    #[must_use]
    pub fn key_store_type(mut self, store_type: StoreType) -> Self {
        self.config().key_store_type = Some(store_type);
        self
    }

    /// Set the key store path alone.
    #[must_use]
    pub fn key_store_path(mut self, path: impl Into<String>) -> Self {
        self.config().key_store_path = Some(path.into());
        self
    }

    /// Set the trust store.
    #[must_use]
    pub fn trust_store(
        mut self,
        store_type: StoreType,
        path: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let config = self.config();
        config.trust_store_type = Some(store_type);
        config.trust_store_path = Some(path.into());
        config.trust_store_password = Some(password.into());
        self
    }

    /// Set the trust store type alone.
    #[must_use]
    pub fn trust_store_type(mut self, store_type: StoreType) -> Self {
        self.config().trust_store_type = Some(store_type);
        self
    }

    /// Set the trust store path alone.
    #[must_use]
    pub fn trust_store_path(mut self, path: impl Into<String>) -> Self {
        self.config().trust_store_path = Some(path.into());
        self
    }

    /// Set minimum connections per node.
    #[must_use]
    pub fn min_connections(mut self, n: u32) -> Self {
        self.config().min_connections = n;
        self
    }

    /// Set maximum connections per node.
    #[must_use]
    pub fn max_connections(mut self, n: u32) -> Self {
        self.config().max_connections = n;
        self
    }

    /// Set attempts per request.
    #[must_use]
    pub fn execution_attempts(mut self, attempts: u32) -> Self {
        self.config().execution_attempts = attempts;
        self
    }

    /// Block on pool exhaustion.
    #[must_use]
    pub fn block_on_max_connections(mut self, block: bool) -> Self {
        self.config().block_on_max_connections = block;
        self
    }

    /// Set idle timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config().idle_timeout = timeout;
        self
    }

    /// Set connection timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config().connection_timeout = timeout;
        self
    }

    /// Parse the nodes and validate the configuration.
    pub fn build(self) -> BundleResult<ClusterConfig> {
        let mut config = self.config.unwrap_or_default();
        config.nodes = self
            .nodes
            .iter()
            .map(|node| node.parse())
            .collect::<BundleResult<Vec<NodeAddress>>>()?;
        config.validate()?;
        Ok(config)
    }
}

static ENV_VAR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").ok());

fn expand_env_vars(content: &str) -> String {
    let Some(re) = ENV_VAR.as_ref() else {
        return content.to_string();
    };

    re.replace_all(content, |caps: &Captures<'_>| {
        match (std::env::var(&caps[1]), caps.get(2)) {
            (Ok(value), _) => value,
            (Err(_), Some(default)) => default.as_str().to_string(),
            (Err(_), None) => caps[0].to_string(),
        }
    })
    .into_owned()
}

/// Parse a human-readable duration such as `500ms`, `1s`, `2 minutes` or a
/// bare millisecond count.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (digits, unit) = input.split_at(split);
    let value: u64 = digits.parse().ok()?;

    let duration = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "ms" | "millis" | "millisecond" | "milliseconds" => Duration::from_millis(value),
        "us" | "microsecond" | "microseconds" => Duration::from_micros(value),
        "ns" | "nanosecond" | "nanoseconds" => Duration::from_nanos(value),
        "s" | "sec" | "second" | "seconds" => Duration::from_secs(value),
        "m" | "min" | "minute" | "minutes" => Duration::from_secs(value.checked_mul(60)?),
        "h" | "hour" | "hours" => Duration::from_secs(value.checked_mul(3600)?),
        "d" | "day" | "days" => Duration::from_secs(value.checked_mul(86_400)?),
        _ => return None,
    };
    Some(duration)
}

mod duration_format {
    use std::fmt;
    use std::time::Duration;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        if duration.subsec_nanos() % 1_000_000 == 0 {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        } else {
            serializer.serialize_str(&format!("{}ns", duration.as_nanos()))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        deserializer.deserialize_any(DurationVisitor)
    }

    struct DurationVisitor;

    impl Visitor<'_> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("milliseconds or a duration string such as \"1s\"")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
            Ok(Duration::from_millis(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
            u64::try_from(v)
                .map(Duration::from_millis)
                .map_err(|_| E::custom("duration must not be negative"))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
            super::parse_duration(v).ok_or_else(|| E::custom(format!("invalid duration `{v}`")))
        }
    }
}
