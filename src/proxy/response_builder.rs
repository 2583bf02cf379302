//! Terminal response assembly.
//!
//! Folds the raw status/headers/body of the last exchange together with the
//! sidecar data (timing, TLS record, redirect chain, size accounting) into
//! the payload the front-end renders.

use super::types::{RedirectHop, ResponseData, SizeBreakdown, TlsInfo};
use crate::error::ProxyError;
use crate::infra::MultiDecompressor;
use crate::shared::{is_valid_now, status_text, CapturedCertInfo, DetailedTiming};
use base64::Engine;
use hyper::Version;
use std::collections::HashMap;
use std::net::IpAddr;

/// Content types rendered as text; everything else is base64-encoded.
const TEXTUAL_TYPES: [&str; 9] = [
    "text/",
    "application/json",
    "application/xml",
    "application/javascript",
    "application/x-javascript",
    "application/ecmascript",
    "application/x-www-form-urlencoded",
    "+json",
    "+xml",
];

/// Whether the body should be represented as base64 rather than text.
///
/// A missing content-type is treated as text.
pub fn is_binary_content(content_type: Option<&str>) -> bool {
    let ct = match content_type {
        Some(ct) => ct.to_lowercase(),
        None => return false,
    };

    !TEXTUAL_TYPES.iter().any(|t| ct.contains(t))
}

/// Protocol label as reported by the transport.
pub fn version_to_string(version: Version) -> String {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/1.1",
    }
    .to_string()
}

/// Everything the builder needs from one finished execution.
pub struct ResponseBuildParams {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body_bytes: Vec<u8>,
    pub timing: DetailedTiming,
    pub final_url: String,
    pub redirect_chain: Vec<RedirectHop>,
    pub tls_info: Option<CapturedCertInfo>,
    pub http_version: Version,
    pub server_ip: Option<IpAddr>,
    pub resolved_ips: Vec<String>,
    pub request_headers: HashMap<String, String>,
    pub request_body_size: Option<usize>,
    pub hostname: String,
    pub port: u16,
}

/// Builds the success payload.
///
/// Decompresses the body per content-encoding, discriminates binary content,
/// computes the size breakdown (header bytes use the synthetic status line
/// plus CRLF framing) and stamps the TLS validity flag at report time.
pub fn build_response(params: ResponseBuildParams) -> Result<ResponseData, ProxyError> {
    let ResponseBuildParams {
        status,
        headers,
        body_bytes,
        timing,
        final_url,
        redirect_chain,
        tls_info,
        http_version,
        server_ip,
        resolved_ips,
        request_headers,
        request_body_size,
        hostname,
        port,
    } = params;

    let content_type = headers.get("content-type").map(|s| s.as_str());
    let content_encoding = headers.get("content-encoding").map(|s| s.as_str());
    let is_binary = is_binary_content(content_type);

    let decompressed = MultiDecompressor::new().decompress(&body_bytes, content_encoding)?;
    let compressed_size = decompressed.compressed_size;
    let body_size = decompressed.decompressed_size;

    let (body, body_base64) = if is_binary {
        let b64 = base64::engine::general_purpose::STANDARD.encode(&decompressed.data);
        (String::new(), Some(b64))
    } else {
        (String::from_utf8_lossy(&decompressed.data).to_string(), None)
    };

    let status_line = format!(
        "{} {} {}",
        version_to_string(http_version),
        status,
        status_text(status)
    );
    let header_size: usize = headers
        .iter()
        .map(|(k, v)| k.len() + 2 + v.len() + 2)
        .sum::<usize>()
        + status_line.len()
        + 2;

    let compression_ratio = if content_encoding.is_some() && body_size > 0 {
        Some(compressed_size as f64 / body_size as f64)
    } else {
        None
    };

    let size_breakdown = SizeBreakdown {
        headers: header_size,
        body: body_size,
        total: header_size + body_size,
        compressed: content_encoding.map(|_| compressed_size),
        uncompressed: content_encoding.map(|_| body_size),
        encoding: content_encoding.map(|s| s.to_string()),
        compression_ratio,
    };

    let tls = tls_info.map(|info| {
        let valid = match (info.valid_from, info.valid_to) {
            (Some(from), Some(to)) => Some(is_valid_now(from, to)),
            _ => None,
        };
        TlsInfo {
            protocol: Some(info.protocol),
            cipher: Some(info.cipher),
            issuer: info.issuer,
            subject: info.subject,
            valid_from: info.valid_from,
            valid_to: info.valid_to,
            valid,
            sans: info.san,
        }
    });

    let server_software = headers.get("server").cloned();
    let connection = headers.get("connection").cloned();

    Ok(ResponseData {
        status,
        status_text: status_text(status).to_string(),
        headers,
        request_headers: Some(request_headers),
        body,
        body_base64,
        is_binary,
        size: body_size,
        timing: timing.to_timing_info(),
        url: final_url,
        redirected: !redirect_chain.is_empty(),
        redirect_chain: if redirect_chain.is_empty() {
            None
        } else {
            Some(redirect_chain)
        },
        tls,
        size_breakdown: Some(size_breakdown),
        server_ip: server_ip.map(|ip| ip.to_string()),
        protocol: Some(version_to_string(http_version)),
        from_cache: Some(false),
        resource_type: Some("fetch".to_string()),
        request_body_size,
        connection,
        server_software,
        hostname: Some(hostname),
        port: Some(port),
        resolved_ips,
    })
}
