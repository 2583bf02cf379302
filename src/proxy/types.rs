//! Wire types shared by the HTTP binding and the desktop IPC binding.
//!
//! Field names serialize in camelCase to match the browser extension's
//! protocol, so the front-end renders identical visualisations regardless of
//! which backend executed the request.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Incoming proxy request from the frontend.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
    /// Timeout in milliseconds; bounds the whole execution end-to-end.
    pub timeout: Option<u64>,
}

/// Per-phase timing in milliseconds.
///
/// Optional phases are present only when they ran on the first hop.
#[derive(Debug, Clone, Serialize, Default)]
pub struct TimingInfo {
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttfb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download: Option<u64>,
    /// Queue wait is not measured; reported as 0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked: Option<u64>,
}

/// One 3xx exchange observed while following redirects.
#[derive(Debug, Clone, Serialize)]
pub struct RedirectHop {
    /// URL at entry to the hop.
    pub url: String,
    pub status: u16,
    /// Hop elapsed time in milliseconds.
    pub duration: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opaque: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// TLS session and peer-certificate details from the first handshake.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cipher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<u64>,
    /// Computed at report time: `validFrom <= now <= validTo`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sans: Vec<String>,
}

/// Byte accounting for the terminal response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeBreakdown {
    /// Status line plus CRLF-framed header fields.
    pub headers: usize,
    /// Body bytes after decompression.
    pub body: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uncompressed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
}

/// Successful response payload matching the extension protocol.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    pub status: u16,
    pub status_text: String,
    /// Lower-cased header names; first value wins on duplicates.
    pub headers: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_headers: Option<HashMap<String, String>>,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_base64: Option<String>,
    pub is_binary: bool,
    /// Decompressed body byte length.
    pub size: usize,
    pub timing: TimingInfo,
    /// URL of the last exchange.
    pub url: String,
    pub redirected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_chain: Option<Vec<RedirectHop>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_breakdown: Option<SizeBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_cache: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_software: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub resolved_ips: Vec<String>,
}

/// Error payload matching the extension protocol.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorData {
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Envelope returned by every invocation surface.
#[derive(Debug, Clone, Serialize)]
pub struct ProxyResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorData>,
}

impl ProxyResponse {
    pub fn success(data: ResponseData) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String, code: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorData {
                message,
                code,
                name: None,
            }),
        }
    }
}

impl From<crate::error::ProxyError> for ProxyResponse {
    fn from(err: crate::error::ProxyError) -> Self {
        Self::error(err.to_string(), err.code().to_string())
    }
}
