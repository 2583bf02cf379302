//! DNS resolution with timing.

use crate::error::ProxyError;
use hickory_resolver::{config::*, TokioAsyncResolver};
use std::{net::IpAddr, sync::Arc, time::Instant};
use tokio::sync::OnceCell;

/// Resolved addresses plus the wall-clock cost of the lookup.
#[derive(Debug)]
pub struct DnsResult {
    /// Addresses in the resolver's answer order.
    pub ips: Vec<IpAddr>,
    /// Elapsed milliseconds; zero for literal-IP inputs.
    pub duration_ms: u64,
}

/// Hostname-to-address resolution.
///
/// Abstracted behind a trait so tests can substitute a canned resolver.
#[allow(async_fn_in_trait)]
pub trait DnsResolver: Send + Sync {
    /// Resolves `host` to one or more addresses.
    ///
    /// A host that already parses as a literal IPv4/IPv6 address is returned
    /// immediately with zero elapsed time.
    async fn resolve(&self, host: &str) -> Result<DnsResult, ProxyError>;
}

// Process-wide resolver; lookups share its cache.
static DNS_RESOLVER: OnceCell<Arc<TokioAsyncResolver>> = OnceCell::const_new();

async fn get_resolver() -> Arc<TokioAsyncResolver> {
    DNS_RESOLVER
        .get_or_init(|| async {
            Arc::new(TokioAsyncResolver::tokio(
                ResolverConfig::default(),
                ResolverOpts::default(),
            ))
        })
        .await
        .clone()
}

/// Resolver backed by hickory-resolver's tokio runtime integration.
#[derive(Default)]
pub struct HickoryDnsResolver;

impl HickoryDnsResolver {
    pub fn new() -> Self {
        Self
    }
}

impl DnsResolver for HickoryDnsResolver {
    async fn resolve(&self, host: &str) -> Result<DnsResult, ProxyError> {
        let start = Instant::now();

        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(DnsResult {
                ips: vec![ip],
                duration_ms: 0,
            });
        }

        let resolver = get_resolver().await;
        let response = resolver
            .lookup_ip(host)
            .await
            .map_err(|e| ProxyError::Dns(format!("DNS lookup failed: {}", e)))?;

        let duration_ms = start.elapsed().as_millis() as u64;
        let ips: Vec<IpAddr> = response.iter().collect();
        if ips.is_empty() {
            return Err(ProxyError::Dns("DNS lookup returned no addresses".to_string()));
        }

        Ok(DnsResult { ips, duration_ms })
    }
}

/// Resolution through the default resolver.
pub async fn resolve_dns(host: &str) -> Result<DnsResult, ProxyError> {
    HickoryDnsResolver::new().resolve(host).await
}
