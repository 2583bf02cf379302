//! TLS client configuration and connection establishment.
//!
//! Verification is strict against the Mozilla root program by default.
//! Setting `PROXY_INSECURE_TLS=1` swaps in an accept-all verifier so
//! self-signed endpoints can still be introspected; certificate issues are
//! then visible in the reported validity window rather than as a handshake
//! failure.

use crate::error::ProxyError;
use rustls::pki_types::{CertificateDer, ServerName};
use std::env;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::{client::TlsStream, TlsConnector};

/// Source of TLS client configurations.
pub trait TlsProvider: Send + Sync {
    fn client_config(&self) -> Arc<rustls::ClientConfig>;

    fn connector(&self) -> TlsConnector {
        TlsConnector::from(self.client_config())
    }
}

/// rustls-backed provider; verification mode fixed at construction.
#[derive(Default)]
pub struct RustlsTlsProvider {
    insecure: bool,
}

impl RustlsTlsProvider {
    /// Strictly-verifying provider.
    pub fn new() -> Self {
        Self { insecure: false }
    }

    /// Provider honouring the `PROXY_INSECURE_TLS` environment switch.
    pub fn from_env() -> Self {
        Self {
            insecure: insecure_tls_enabled(),
        }
    }
}

impl TlsProvider for RustlsTlsProvider {
    fn client_config(&self) -> Arc<rustls::ClientConfig> {
        create_tls_config(self.insecure)
    }
}

/// Whether certificate verification is disabled via the environment.
pub fn insecure_tls_enabled() -> bool {
    env::var("PROXY_INSECURE_TLS")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

/// Builds a TLS client configuration.
///
/// Strict mode verifies against webpki-roots with no client auth; insecure
/// mode installs [`AcceptAllVerifier`] instead.
pub fn create_tls_config(insecure: bool) -> Arc<rustls::ClientConfig> {
    let config = if insecure {
        rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAllVerifier))
            .with_no_client_auth()
    } else {
        let root_store =
            rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth()
    };

    Arc::new(config)
}

/// Certificate verifier that accepts any chain.
///
/// Only reachable through the `PROXY_INSECURE_TLS` switch; validity problems
/// are still surfaced through the reported certificate window.
#[derive(Debug)]
struct AcceptAllVerifier;

impl rustls::client::danger::ServerCertVerifier for AcceptAllVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}

/// Runs the TLS handshake over an established TCP stream.
pub async fn connect_tls<P: TlsProvider>(
    provider: &P,
    tcp_stream: TcpStream,
    server_name: &str,
) -> Result<TlsStream<TcpStream>, ProxyError> {
    let connector = provider.connector();

    let server_name = ServerName::try_from(server_name.to_string())
        .map_err(|e| ProxyError::Tls(format!("Invalid server name: {}", e)))?;

    connector
        .connect(server_name, tcp_stream)
        .await
        .map_err(|e| ProxyError::Tls(format!("TLS handshake failed: {}", e)))
}
