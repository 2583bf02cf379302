//! X.509 peer-certificate introspection.
//!
//! Reads the negotiated protocol and cipher from a completed handshake and
//! parses the leaf certificate for the fields the front-end renders.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::net::TcpStream;
use x509_parser::prelude::*;

/// TLS session details captured from the first handshake of an execution.
#[derive(Debug, Clone)]
pub struct CapturedCertInfo {
    pub protocol: String,
    pub cipher: String,
    pub issuer: Option<String>,
    pub subject: Option<String>,
    pub valid_from: Option<u64>,
    pub valid_to: Option<u64>,
    pub san: Vec<String>,
}

/// Fields parsed out of a DER-encoded leaf certificate.
#[derive(Debug, Default)]
pub struct BasicCertInfo {
    pub issuer: Option<String>,
    pub subject: Option<String>,
    pub valid_from: Option<u64>,
    pub valid_to: Option<u64>,
    pub san: Vec<String>,
}

/// Parses the leaf certificate fields from DER-encoded X.509 data.
///
/// Subject and issuer prefer the CN attribute and fall back to the full
/// distinguished name. Fields that cannot be parsed stay `None` or empty.
pub fn parse_x509_basic(der: &[u8]) -> BasicCertInfo {
    let mut info = BasicCertInfo::default();

    let Ok((_, cert)) = X509Certificate::from_der(der) else {
        return info;
    };

    info.subject = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(|s| s.to_string())
        .or_else(|| Some(cert.subject().to_string()));

    info.issuer = cert
        .issuer()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(|s| s.to_string())
        .or_else(|| Some(cert.issuer().to_string()));

    info.valid_from = Some(cert.validity().not_before.timestamp() as u64);
    info.valid_to = Some(cert.validity().not_after.timestamp() as u64);

    if let Ok(Some(san_ext)) = cert.subject_alternative_name() {
        for name in &san_ext.value.general_names {
            match name {
                GeneralName::DNSName(dns) => info.san.push(dns.to_string()),
                GeneralName::IPAddress(ip) => {
                    if let Ok(octets) = <[u8; 4]>::try_from(*ip) {
                        info.san.push(Ipv4Addr::from(octets).to_string());
                    } else if let Ok(octets) = <[u8; 16]>::try_from(*ip) {
                        info.san.push(Ipv6Addr::from(octets).to_string());
                    }
                }
                _ => {}
            }
        }
    }

    info
}

/// Whether `now` falls inside the certificate validity window.
pub fn is_valid_now(valid_from: u64, valid_to: u64) -> bool {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    now >= valid_from && now <= valid_to
}

/// Reads protocol, cipher and leaf-certificate details from a TLS stream.
///
/// Returns `None` when the peer presented no certificate.
pub fn extract_cert_info(
    conn: &tokio_rustls::client::TlsStream<TcpStream>,
) -> Option<CapturedCertInfo> {
    let (_, session) = conn.get_ref();

    let protocol = match session.protocol_version() {
        Some(rustls::ProtocolVersion::TLSv1_0) => "TLS 1.0".to_string(),
        Some(rustls::ProtocolVersion::TLSv1_1) => "TLS 1.1".to_string(),
        Some(rustls::ProtocolVersion::TLSv1_2) => "TLS 1.2".to_string(),
        Some(rustls::ProtocolVersion::TLSv1_3) => "TLS 1.3".to_string(),
        _ => "TLS".to_string(),
    };

    let cipher = session
        .negotiated_cipher_suite()
        .map(|cs| format!("{:?}", cs.suite()))
        .unwrap_or_else(|| "Unknown".to_string());

    let certs = session.peer_certificates()?;
    let leaf = certs.first()?;
    let parsed = parse_x509_basic(leaf.as_ref());

    Some(CapturedCertInfo {
        protocol,
        cipher,
        issuer: parsed.issuer,
        subject: parsed.subject,
        valid_from: parsed.valid_from,
        valid_to: parsed.valid_to,
        san: parsed.san,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_invalid_der() {
        let info = parse_x509_basic(&[0, 1, 2, 3]);
        assert!(info.issuer.is_none());
        assert!(info.subject.is_none());
        assert!(info.san.is_empty());
    }

    #[test]
    fn test_validity_window() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        assert!(is_valid_now(now - 3600, now + 3600));
        assert!(!is_valid_now(now + 60, now + 3600));
        assert!(!is_valid_now(now - 3600, now - 60));
    }
}
