//! Shared utilities used across the engine.

pub mod cert_parser;
pub mod status_text;
pub mod timing;

pub use cert_parser::{extract_cert_info, is_valid_now, parse_x509_basic, BasicCertInfo, CapturedCertInfo};
pub use status_text::status_text;
pub use timing::DetailedTiming;
