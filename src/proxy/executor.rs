//! Request execution engine.
//!
//! Dials the target itself instead of going through a pooled client so that
//! every network phase can be timed, the TLS peer certificate inspected, and
//! the redirect chain traversed manually with per-hop records.

use super::context::RequestContext;
use super::response_builder::{build_response, ResponseBuildParams};
use super::types::{ProxyRequest, ProxyResponse, RedirectHop, ResponseData};
use crate::error::ProxyError;
use crate::infra::{connect_tls, resolve_dns, RustlsTlsProvider};
use crate::shared::{extract_cert_info, CapturedCertInfo, DetailedTiming};
use http_body_util::{BodyExt, Full};
use hyper::{body::Bytes, header::HeaderName, Method, Request, Version};
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Redirect hop cap.
pub const MAX_REDIRECTS: usize = 20;

/// Default end-to-end timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// End-to-end deadline shared by every suspension point of one execution.
#[derive(Debug, Clone, Copy)]
struct Deadline(Instant);

impl Deadline {
    fn after_ms(timeout_ms: u64) -> Self {
        Self(Instant::now() + Duration::from_millis(timeout_ms))
    }

    fn remaining(&self) -> Result<Duration, ProxyError> {
        self.0
            .checked_duration_since(Instant::now())
            .ok_or(ProxyError::Timeout)
    }
}

/// Awaits `fut` bounded by the deadline and the caller's cancellation token.
///
/// Cancellation wins over timeout when both fire in the same poll.
async fn suspend<F, T>(
    deadline: Deadline,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, ProxyError>
where
    F: Future<Output = T>,
{
    let remaining = deadline.remaining()?;
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ProxyError::Cancelled),
        out = timeout(remaining, fut) => out.map_err(|_| ProxyError::Timeout),
    }
}

/// One completed HTTP exchange.
struct HopOutcome {
    status: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
    version: Version,
}

/// Executes a proxy request to completion.
///
/// Never fails at the call site: errors are folded into the envelope.
pub async fn execute_request(request: ProxyRequest) -> ProxyResponse {
    execute_request_cancellable(request, CancellationToken::new()).await
}

/// Executes a proxy request that the caller can abort.
///
/// Cancelling the token aborts the execution at the next suspension point
/// and yields a `CANCELLED` envelope, distinct from `TIMEOUT`.
pub async fn execute_request_cancellable(
    request: ProxyRequest,
    cancel: CancellationToken,
) -> ProxyResponse {
    match run(&request, &cancel).await {
        Ok(data) => ProxyResponse::success(data),
        Err(err) => ProxyResponse::from(err),
    }
}

async fn run(
    request: &ProxyRequest,
    cancel: &CancellationToken,
) -> Result<ResponseData, ProxyError> {
    let mut timing = DetailedTiming::new();
    let mut ctx = RequestContext::new(&request.url)?;
    let deadline = Deadline::after_ms(request.timeout.unwrap_or(DEFAULT_TIMEOUT_MS));
    let tls_provider = RustlsTlsProvider::from_env();

    // First-hop DNS; the first address doubles as the reported server IP.
    timing.start_dns();
    let dns = suspend(deadline, cancel, resolve_dns(ctx.host())).await??;
    timing.end_dns();

    let resolved_ips: Vec<String> = dns.ips.iter().map(ToString::to_string).collect();
    let server_ip = first_ip(&dns.ips)?;

    let request_headers = request.headers.clone();
    let request_body_size = request.body.as_ref().map(|b| b.len());

    let mut redirect_chain: Vec<RedirectHop> = Vec::new();
    let mut tls_info: Option<CapturedCertInfo> = None;
    let mut first_hop = true;
    let mut hop_ip = Some(server_ip);

    loop {
        let hop_start = Instant::now();

        // Redirect hops resolve their own target; only the first hop's
        // lookup is timed and reported.
        let ip = match hop_ip.take() {
            Some(ip) => ip,
            None => {
                let dns = suspend(deadline, cancel, resolve_dns(ctx.host())).await??;
                first_ip(&dns.ips)?
            }
        };

        let addr = SocketAddr::new(ip, ctx.port());
        if first_hop {
            timing.start_tcp();
        }
        let tcp_stream = suspend(deadline, cancel, TcpStream::connect(addr))
            .await?
            .map_err(|e| ProxyError::ConnectionFailed(e.to_string()))?;
        if first_hop {
            timing.end_tcp();
        }

        let outcome = if ctx.is_tls() {
            if first_hop {
                timing.start_tls();
            }
            let tls_stream = suspend(
                deadline,
                cancel,
                connect_tls(&tls_provider, tcp_stream, ctx.host()),
            )
            .await??;
            if first_hop {
                timing.end_tls();
                tls_info = extract_cert_info(&tls_stream);
            }
            exchange(tls_stream, request, &ctx, &mut timing, first_hop, deadline, cancel).await?
        } else {
            exchange(tcp_stream, request, &ctx, &mut timing, first_hop, deadline, cancel).await?
        };

        if (300..400).contains(&outcome.status) {
            if let Some(location) = outcome.headers.get("location").cloned() {
                let hop_url = ctx.url().to_string();
                let next_url = ctx.update_from_redirect(&location);

                redirect_chain.push(RedirectHop {
                    url: hop_url,
                    status: outcome.status,
                    duration: hop_start.elapsed().as_millis() as u64,
                    headers: Some(outcome.headers),
                    opaque: None,
                    message: Some(format!("Redirect to: {}", next_url)),
                });

                if redirect_chain.len() >= MAX_REDIRECTS {
                    return Err(ProxyError::TooManyRedirects);
                }

                tracing::debug!(status = outcome.status, location = %location, next = %next_url, "following redirect");

                first_hop = false;
                continue;
            }
        }

        timing.finish();

        return build_response(ResponseBuildParams {
            status: outcome.status,
            headers: outcome.headers,
            body_bytes: outcome.body,
            timing,
            final_url: ctx.url().to_string(),
            redirect_chain,
            tls_info,
            http_version: outcome.version,
            server_ip: Some(server_ip),
            resolved_ips,
            request_headers,
            request_body_size,
            hostname: ctx.host().to_string(),
            port: ctx.port(),
        });
    }
}

fn first_ip(ips: &[IpAddr]) -> Result<IpAddr, ProxyError> {
    ips.first()
        .copied()
        .ok_or_else(|| ProxyError::Dns("DNS lookup returned no addresses".to_string()))
}

/// Sends the request over an established stream and reads the full response.
///
/// Works for both plain and TLS-wrapped connections; on the first hop the
/// request-send, TTFB and download phases are framed around the exchange.
async fn exchange<T>(
    io: T,
    request: &ProxyRequest,
    ctx: &RequestContext,
    timing: &mut DetailedTiming,
    first_hop: bool,
    deadline: Deadline,
    cancel: &CancellationToken,
) -> Result<HopOutcome, ProxyError>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = suspend(
        deadline,
        cancel,
        hyper::client::conn::http1::handshake(TokioIo::new(io)),
    )
    .await?
    .map_err(|e| ProxyError::RequestFailed(format!("HTTP handshake failed: {}", e)))?;

    // The connection task owns the socket; it ends when the exchange does.
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!("connection task ended: {}", e);
        }
    });

    let outbound = build_outbound(request, ctx)?;

    if first_hop {
        timing.start_request();
    }

    let response = suspend(deadline, cancel, sender.send_request(outbound))
        .await?
        .map_err(|e| ProxyError::RequestFailed(format!("Request failed: {}", e)))?;

    if first_hop {
        timing.mark_ttfb();
    }

    let version = response.version();
    let status = response.status().as_u16();

    // Lower-cased names for the output map; first observed value wins.
    let mut headers: HashMap<String, String> = HashMap::new();
    for (name, value) in response.headers() {
        headers
            .entry(name.as_str().to_string())
            .or_insert_with(|| value.to_str().unwrap_or("").to_string());
    }

    if first_hop {
        timing.start_download();
    }
    let body = suspend(deadline, cancel, response.into_body().collect())
        .await?
        .map_err(|e| ProxyError::BodyRead(format!("Failed to read body: {}", e)))?
        .to_bytes()
        .to_vec();
    if first_hop {
        timing.end_download();
    }

    Ok(HopOutcome {
        status,
        headers,
        body,
        version,
    })
}

fn build_outbound(
    request: &ProxyRequest,
    ctx: &RequestContext,
) -> Result<Request<Full<Bytes>>, ProxyError> {
    let method = Method::from_str(&request.method.to_uppercase())
        .map_err(|_| ProxyError::RequestBuild(format!("Invalid method: {}", request.method)))?;

    let mut builder = Request::builder()
        .method(method)
        .uri(ctx.path())
        .header("Host", ctx.host_header());

    for (key, value) in &request.headers {
        if let Ok(name) = HeaderName::from_str(key) {
            builder = builder.header(name, value);
        }
    }

    let caller_set_encoding = request
        .headers
        .keys()
        .any(|k| k.eq_ignore_ascii_case("accept-encoding"));
    if !caller_set_encoding {
        builder = builder.header("Accept-Encoding", "gzip, deflate, br");
    }

    let body = request.body.clone().unwrap_or_default();
    builder
        .body(Full::new(Bytes::from(body)))
        .map_err(|e| ProxyError::RequestBuild(format!("Failed to build request: {}", e)))
}
