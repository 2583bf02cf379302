//! Infrastructure layer: DNS resolution, TLS connections and content
//! decompression behind small traits so implementations can be swapped in
//! tests without touching the executor.

pub mod decompressor;
pub mod dns;
pub mod tls;

pub use decompressor::{decompress_body, DecompressResult, Decompressor, MultiDecompressor};
pub use dns::{resolve_dns, DnsResolver, DnsResult, HickoryDnsResolver};
pub use tls::{connect_tls, create_tls_config, insecure_tls_enabled, RustlsTlsProvider, TlsProvider};
