//! OpenSSL context from loaded key and trust stores.

use openssl::pkcs12::Pkcs12;
use openssl::ssl::{SslContext, SslContextBuilder, SslMethod, SslVerifyMode};
use openssl::x509::X509;
use prax_bundle::{CertificateStore, NodeSettings, StoreMaterial};
use tracing::debug;

use crate::error::ScyllaResult;

/// Build an SSL context, or `None` when no store is configured.
pub fn ssl_context(settings: &NodeSettings) -> ScyllaResult<Option<SslContext>> {
    if !settings.uses_tls() {
        return Ok(None);
    }

    let mut builder = SslContextBuilder::new(SslMethod::tls())?;

    if let Some(store) = &settings.trust_store {
        add_trust_store(&mut builder, store)?;
        builder.set_verify(SslVerifyMode::PEER);
    }

    if let Some(store) = &settings.key_store {
        add_key_store(&mut builder, store)?;
    }

    Ok(Some(builder.build()))
}

fn add_trust_store(builder: &mut SslContextBuilder, store: &CertificateStore) -> ScyllaResult<()> {
    match store.material() {
        StoreMaterial::Platform => builder.set_default_verify_paths()?,
        StoreMaterial::Certificate(der) => {
            builder.cert_store_mut().add_cert(X509::from_der(der)?)?;
        }
        StoreMaterial::Pkcs12(archive) => {
            let parsed = Pkcs12::from_der(archive)?.parse2(store.password().unwrap_or_default())?;
            for ca in parsed.ca.into_iter().flatten() {
                builder.cert_store_mut().add_cert(ca)?;
            }
            if let Some(cert) = parsed.cert {
                builder.cert_store_mut().add_cert(cert)?;
            }
        }
    }
    debug!(alias = store.alias(), "Trust store installed");
    Ok(())
}

fn add_key_store(builder: &mut SslContextBuilder, store: &CertificateStore) -> ScyllaResult<()> {
    match store.material() {
        StoreMaterial::Platform => {
            debug!(alias = store.alias(), "Platform key store has no exportable key; skipping");
            return Ok(());
        }
        StoreMaterial::Certificate(der) => {
            let cert = X509::from_der(der)?;
            builder.set_certificate(&cert)?;
        }
        StoreMaterial::Pkcs12(archive) => {
            let parsed = Pkcs12::from_der(archive)?.parse2(store.password().unwrap_or_default())?;
            if let Some(cert) = parsed.cert {
                builder.set_certificate(&cert)?;
            }
            if let Some(key) = parsed.pkey {
                builder.set_private_key(&key)?;
            }
        }
    }
    debug!(alias = store.alias(), "Key store installed");
    Ok(())
}
