//! Engine error taxonomy.
//!
//! Every failure the executor can produce carries a stable machine code that
//! the front-end switches on. Errors are folded into the JSON envelope at the
//! public boundary; the transport-level status of the HTTP binding stays 200.

use thiserror::Error;

/// Failure of a single proxy execution.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// URL unparsable, missing host, or unsupported scheme.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Resolver failure or empty result.
    #[error("{0}")]
    Dns(String),

    /// TCP dial failure.
    #[error("TCP connection failed: {0}")]
    ConnectionFailed(String),

    /// Handshake or certificate verification failure.
    #[error("{0}")]
    Tls(String),

    /// The outbound request could not be constructed.
    #[error("{0}")]
    RequestBuild(String),

    /// I/O error during send or while awaiting response headers.
    #[error("{0}")]
    RequestFailed(String),

    /// I/O error while reading the response body.
    #[error("{0}")]
    BodyRead(String),

    /// Content-encoding decode failure.
    #[error("{0}")]
    Decompression(String),

    /// The redirect hop cap was reached.
    #[error("Too many redirects")]
    TooManyRedirects,

    /// The end-to-end deadline was exceeded.
    #[error("Request timed out")]
    Timeout,

    /// The caller cancelled the execution.
    #[error("Request was cancelled")]
    Cancelled,
}

impl ProxyError {
    /// Machine tag reported in the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ProxyError::InvalidUrl(_) => "INVALID_URL",
            ProxyError::Dns(_) => "DNS_ERROR",
            ProxyError::ConnectionFailed(_) => "CONNECTION_FAILED",
            ProxyError::Tls(_) => "TLS_ERROR",
            ProxyError::RequestBuild(_) => "REQUEST_BUILD_ERROR",
            ProxyError::RequestFailed(_) => "REQUEST_FAILED",
            ProxyError::BodyRead(_) => "BODY_READ_ERROR",
            ProxyError::Decompression(_) => "DECOMPRESSION_ERROR",
            ProxyError::TooManyRedirects => "TOO_MANY_REDIRECTS",
            ProxyError::Timeout => "TIMEOUT",
            ProxyError::Cancelled => "CANCELLED",
        }
    }
}
