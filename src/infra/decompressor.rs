//! Response body decompression.
//!
//! One decoder per supported content-encoding (gzip, deflate, brotli) behind
//! a common trait, plus a multi-format front that dispatches on the header
//! value and passes unknown encodings through untouched.

use crate::error::ProxyError;
use std::io::Read;

/// Outcome of a decompression, with both size sides for the breakdown.
#[derive(Debug)]
pub struct DecompressResult {
    pub data: Vec<u8>,
    pub compressed_size: usize,
    pub decompressed_size: usize,
}

impl DecompressResult {
    fn passthrough(data: &[u8]) -> Self {
        Self {
            compressed_size: data.len(),
            decompressed_size: data.len(),
            data: data.to_vec(),
        }
    }
}

/// A decoder for one content-encoding.
pub trait Decompressor: Send + Sync {
    /// The content-encoding label this decoder handles.
    fn encoding(&self) -> &'static str;

    /// Fully decodes `data`, failing on malformed or truncated streams.
    fn decompress(&self, data: &[u8]) -> Result<DecompressResult, ProxyError>;
}

#[derive(Default)]
pub struct GzipDecompressor;

impl Decompressor for GzipDecompressor {
    fn encoding(&self) -> &'static str {
        "gzip"
    }

    fn decompress(&self, data: &[u8]) -> Result<DecompressResult, ProxyError> {
        let mut decoder = flate2::read::GzDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| ProxyError::Decompression(format!("Gzip decompression failed: {}", e)))?;
        Ok(DecompressResult {
            compressed_size: data.len(),
            decompressed_size: decompressed.len(),
            data: decompressed,
        })
    }
}

#[derive(Default)]
pub struct DeflateDecompressor;

impl Decompressor for DeflateDecompressor {
    fn encoding(&self) -> &'static str {
        "deflate"
    }

    fn decompress(&self, data: &[u8]) -> Result<DecompressResult, ProxyError> {
        let mut decoder = flate2::read::DeflateDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| ProxyError::Decompression(format!("Deflate decompression failed: {}", e)))?;
        Ok(DecompressResult {
            compressed_size: data.len(),
            decompressed_size: decompressed.len(),
            data: decompressed,
        })
    }
}

#[derive(Default)]
pub struct BrotliDecompressor;

impl Decompressor for BrotliDecompressor {
    fn encoding(&self) -> &'static str {
        "br"
    }

    fn decompress(&self, data: &[u8]) -> Result<DecompressResult, ProxyError> {
        let mut decompressed = Vec::new();
        brotli::BrotliDecompress(&mut std::io::Cursor::new(data), &mut decompressed)
            .map_err(|e| ProxyError::Decompression(format!("Brotli decompression failed: {}", e)))?;
        Ok(DecompressResult {
            compressed_size: data.len(),
            decompressed_size: decompressed.len(),
            data: decompressed,
        })
    }
}

/// Dispatches on the content-encoding header value.
#[derive(Default)]
pub struct MultiDecompressor {
    gzip: GzipDecompressor,
    deflate: DeflateDecompressor,
    brotli: BrotliDecompressor,
}

impl MultiDecompressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `data` according to `encoding`.
    ///
    /// An absent or unrecognised encoding passes the bytes through with equal
    /// compressed/decompressed sizes.
    pub fn decompress(
        &self,
        data: &[u8],
        encoding: Option<&str>,
    ) -> Result<DecompressResult, ProxyError> {
        match encoding {
            Some("gzip") => self.gzip.decompress(data),
            Some("deflate") => self.deflate.decompress(data),
            Some("br") => self.brotli.decompress(data),
            _ => Ok(DecompressResult::passthrough(data)),
        }
    }
}

/// Convenience wrapper returning only the decoded bytes.
pub fn decompress_body(body: &[u8], encoding: Option<&str>) -> Result<Vec<u8>, ProxyError> {
    MultiDecompressor::new()
        .decompress(body, encoding)
        .map(|r| r.data)
}
