//! Key and trust store loading.
//!
//! A store holds a single entry read from a certificate file. The key store
//! entry is filed under [`KEY_STORE_ALIAS`] and the trust store entry under
//! [`TRUST_STORE_ALIAS`]; drivers translate the loaded material into whatever
//! their TLS stack expects.

use std::fmt;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

use crate::config::StoreType;
use crate::error::{BundleError, BundleResult};

/// Alias of the client certificate entry in a key store.
pub const KEY_STORE_ALIAS: &str = "1";

/// Alias of the CA certificate entry in a trust store.
pub const TRUST_STORE_ALIAS: &str = "cacert";

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

/// Material held by a [`CertificateStore`].
#[derive(Clone, PartialEq, Eq)]
pub enum StoreMaterial {
    /// A single X.509 certificate in DER encoding.
    Certificate(Vec<u8>),
    /// A PKCS#12 archive, still encrypted with the store password.
    Pkcs12(Vec<u8>),
    /// The operating system's certificate store.
    Platform,
}

impl fmt::Debug for StoreMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Certificate(der) => write!(f, "Certificate({} bytes)", der.len()),
            Self::Pkcs12(bytes) => write!(f, "Pkcs12({} bytes)", bytes.len()),
            Self::Platform => f.write_str("Platform"),
        }
    }
}

/// A loaded key or trust store.
#[derive(Clone)]
pub struct CertificateStore {
    store_type: StoreType,
    alias: &'static str,
    source: Option<String>,
    material: StoreMaterial,
    password: Option<String>,
}

impl CertificateStore {
    /// Load a store from its configured parts.
    ///
    /// Returns `Ok(None)` when no path is configured for a file-backed store.
    /// Platform stores never read a file.
    pub fn load(
        store_type: StoreType,
        alias: &'static str,
        path: Option<&str>,
        password: Option<&str>,
    ) -> BundleResult<Option<Self>> {
        if store_type.is_platform() {
            debug!(alias, store_type = %store_type, "Using platform certificate store");
            return Ok(Some(Self {
                store_type,
                alias,
                source: None,
                material: StoreMaterial::Platform,
                password: password.map(str::to_string),
            }));
        }

        let Some(path) = path.filter(|p| !p.is_empty()) else {
            return Ok(None);
        };

        let bytes = std::fs::read(Path::new(path)).map_err(|e| BundleError::Io {
            path: path.to_string(),
            source: e,
        })?;

        let material = match store_type {
            StoreType::Pkcs12 => {
                if bytes.is_empty() {
                    return Err(BundleError::certificate(path, "PKCS#12 archive is empty"));
                }
                StoreMaterial::Pkcs12(bytes)
            }
            _ => StoreMaterial::Certificate(decode_certificate(path, &bytes)?),
        };

        debug!(alias, path, store_type = %store_type, "Loaded certificate store");

        Ok(Some(Self {
            store_type,
            alias,
            source: Some(path.to_string()),
            material,
            password: password.map(str::to_string),
        }))
    }

    /// Store format.
    #[must_use]
    pub fn store_type(&self) -> &StoreType {
        &self.store_type
    }

    /// Alias of the single entry.
    #[must_use]
    pub fn alias(&self) -> &'static str {
        self.alias
    }

    /// File the store was read from, if any.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Loaded material.
    #[must_use]
    pub fn material(&self) -> &StoreMaterial {
        &self.material
    }

    /// Store password.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl fmt::Debug for CertificateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateStore")
            .field("store_type", &self.store_type)
            .field("alias", &self.alias)
            .field("source", &self.source)
            .field("material", &self.material)
            .finish_non_exhaustive()
    }
}

/// Decode the first certificate of a PEM or DER file into DER bytes.
pub fn decode_certificate(path: &str, bytes: &[u8]) -> BundleResult<Vec<u8>> {
    if bytes.first() == Some(&0x30) {
        let len = der_sequence_len(bytes)
            .ok_or_else(|| BundleError::certificate(path, "truncated DER certificate"))?;
        return Ok(bytes[..len].to_vec());
    }

    let text = std::str::from_utf8(bytes)
        .map_err(|_| BundleError::certificate(path, "not a PEM or DER certificate"))?;
    let start = text
        .find(PEM_BEGIN)
        .ok_or_else(|| BundleError::certificate(path, "no certificate found"))?;
    let body = &text[start + PEM_BEGIN.len()..];
    let end = body
        .find(PEM_END)
        .ok_or_else(|| BundleError::certificate(path, "unterminated PEM block"))?;

    let encoded: String = body[..end].split_whitespace().collect();
    let der = STANDARD
        .decode(encoded)
        .map_err(|e| BundleError::certificate(path, format!("invalid base64: {e}")))?;

    match der_sequence_len(&der) {
        Some(len) if len == der.len() => Ok(der),
        _ => Err(BundleError::certificate(path, "PEM body is not a DER certificate")),
    }
}

/// Total length of the DER SEQUENCE at the start of `bytes`, header
/// included, if it is complete.
fn der_sequence_len(bytes: &[u8]) -> Option<usize> {
    let (&tag, rest) = bytes.split_first()?;
    if tag != 0x30 {
        return None;
    }
    let (&first, rest) = rest.split_first()?;

    let (header, content) = if first & 0x80 == 0 {
        (2, usize::from(first))
    } else {
        let count = usize::from(first & 0x7f);
        if count == 0 || count > 4 || rest.len() < count {
            return None;
        }
        let content = rest[..count]
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
        (2 + count, content)
    };

    let total = header + content;
    (total <= bytes.len()).then_some(total)
}
