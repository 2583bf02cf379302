//! End-to-end engine tests against local mock servers.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
    routing::{get, post},
    Router,
};
use http_inspector_app::proxy::{execute_request, execute_request_cancellable, ProxyRequest};
use std::collections::HashMap;
use std::io::Write;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server");
    });
    addr
}

fn get_request(url: String) -> ProxyRequest {
    ProxyRequest {
        method: "GET".to_string(),
        url,
        headers: HashMap::new(),
        body: None,
        timeout: None,
    }
}

fn redirect(status: StatusCode, location: &str) -> Response {
    Response::builder()
        .status(status)
        .header(header::LOCATION, location)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_plain_get_text() {
    let app = Router::new().route(
        "/greeting",
        get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "hello") }),
    );
    let addr = serve(app).await;

    let mut request = get_request(format!("http://{}/greeting", addr));
    request
        .headers
        .insert("x-probe".to_string(), "1".to_string());

    let response = execute_request(request).await;
    assert!(response.success, "error: {:?}", response.error);

    let data = response.data.unwrap();
    assert_eq!(data.status, 200);
    assert_eq!(data.status_text, "OK");
    assert_eq!(data.body, "hello");
    assert!(data.body_base64.is_none());
    assert!(!data.is_binary);
    assert_eq!(data.size, 5);
    assert!(!data.redirected);
    assert!(data.redirect_chain.is_none());
    assert!(data.tls.is_none());

    assert_eq!(data.headers.get("content-type").unwrap(), "text/plain");
    assert_eq!(data.request_headers.unwrap().get("x-probe").unwrap(), "1");

    assert_eq!(data.server_ip.as_deref(), Some("127.0.0.1"));
    assert_eq!(data.resolved_ips, vec!["127.0.0.1".to_string()]);
    assert_eq!(data.hostname.as_deref(), Some("127.0.0.1"));
    assert_eq!(data.port, Some(addr.port()));
    assert_eq!(data.protocol.as_deref(), Some("HTTP/1.1"));
    assert_eq!(data.from_cache, Some(false));
    assert_eq!(data.resource_type.as_deref(), Some("fetch"));

    let timing = &data.timing;
    assert!(timing.dns.is_some());
    assert!(timing.tcp.is_some());
    assert!(timing.tls.is_none());
    assert!(timing.ttfb.is_some());
    assert!(timing.download.is_some());
    assert_eq!(timing.blocked, Some(0));

    let breakdown = data.size_breakdown.unwrap();
    assert_eq!(breakdown.body, 5);
    assert_eq!(breakdown.total, breakdown.headers + 5);
    assert!(breakdown.encoding.is_none());
    assert!(breakdown.compression_ratio.is_none());
}

#[tokio::test]
async fn test_gzip_body_is_decompressed_and_accounted() {
    let payload = br#"{"a":1}"#;
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(payload).unwrap();
    let compressed = encoder.finish().unwrap();
    let compressed_len = compressed.len();

    let app = Router::new().route(
        "/data",
        get(move || {
            let compressed = compressed.clone();
            async move {
                (
                    [
                        (header::CONTENT_TYPE, "application/json"),
                        (header::CONTENT_ENCODING, "gzip"),
                    ],
                    compressed,
                )
            }
        }),
    );
    let addr = serve(app).await;

    let response = execute_request(get_request(format!("http://{}/data", addr))).await;
    assert!(response.success, "error: {:?}", response.error);

    let data = response.data.unwrap();
    assert_eq!(data.body, r#"{"a":1}"#);
    assert_eq!(data.size, 7);
    assert!(!data.is_binary);

    let breakdown = data.size_breakdown.unwrap();
    assert_eq!(breakdown.encoding.as_deref(), Some("gzip"));
    assert_eq!(breakdown.compressed, Some(compressed_len));
    assert_eq!(breakdown.uncompressed, Some(7));
    let ratio = breakdown.compression_ratio.unwrap();
    assert!((ratio - compressed_len as f64 / 7.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_redirect_chain_is_traversed_and_recorded() {
    // Terminal server first so the intermediate one can point at it.
    let terminal = Router::new().route("/c", get(|| async { "made it" }));
    let terminal_addr = serve(terminal).await;

    let hops = Router::new()
        .route("/a", get(|| async { redirect(StatusCode::FOUND, "/b") }))
        .route(
            "/b",
            get(move || async move {
                redirect(
                    StatusCode::MOVED_PERMANENTLY,
                    &format!("http://{}/c", terminal_addr),
                )
            }),
        );
    let hops_addr = serve(hops).await;

    let start_url = format!("http://{}/a", hops_addr);
    let response = execute_request(get_request(start_url.clone())).await;
    assert!(response.success, "error: {:?}", response.error);

    let data = response.data.unwrap();
    assert!(data.redirected);
    assert_eq!(data.status, 200);
    assert_eq!(data.body, "made it");
    assert_eq!(data.url, format!("http://{}/c", terminal_addr));

    let chain = data.redirect_chain.unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0].status, 302);
    assert_eq!(chain[0].url, start_url);
    assert_eq!(chain[1].status, 301);
    assert_eq!(chain[1].url, format!("http://{}/b", hops_addr));
    for hop in &chain {
        assert!(hop.message.as_ref().unwrap().starts_with("Redirect to: "));
        assert!(hop.headers.as_ref().unwrap().contains_key("location"));
    }
}

#[tokio::test]
async fn test_redirect_loop_hits_hop_cap() {
    let app = Router::new().route("/loop", get(|| async { redirect(StatusCode::FOUND, "/loop") }));
    let addr = serve(app).await;

    let response = execute_request(get_request(format!("http://{}/loop", addr))).await;
    assert!(!response.success);
    let error = response.error.unwrap();
    assert_eq!(error.code, "TOO_MANY_REDIRECTS");
    assert_eq!(error.message, "Too many redirects");
}

#[tokio::test]
async fn test_binary_download_is_base64() {
    let png_header: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    let app = Router::new().route(
        "/image",
        get(move || async move { ([(header::CONTENT_TYPE, "image/png")], png_header) }),
    );
    let addr = serve(app).await;

    let response = execute_request(get_request(format!("http://{}/image", addr))).await;
    assert!(response.success, "error: {:?}", response.error);

    let data = response.data.unwrap();
    assert!(data.is_binary);
    assert_eq!(data.body, "");
    assert_eq!(data.body_base64.as_deref(), Some("iVBORw0KGgo="));
    assert_eq!(data.size, 8);
}

#[tokio::test]
async fn test_post_body_round_trip() {
    let app = Router::new().route("/echo", post(|body: String| async move { body }));
    let addr = serve(app).await;

    let mut request = get_request(format!("http://{}/echo", addr));
    request.method = "POST".to_string();
    request.body = Some("ping".to_string());

    let response = execute_request(request).await;
    assert!(response.success, "error: {:?}", response.error);

    let data = response.data.unwrap();
    assert_eq!(data.body, "ping");
    assert_eq!(data.request_body_size, Some(4));
}

#[tokio::test]
async fn test_duplicate_response_headers_keep_first_value() {
    let app = Router::new().route(
        "/dup",
        get(|| async {
            Response::builder()
                .status(StatusCode::OK)
                .header("x-dup", "one")
                .header("x-dup", "two")
                .body(Body::from("ok"))
                .unwrap()
        }),
    );
    let addr = serve(app).await;

    let response = execute_request(get_request(format!("http://{}/dup", addr))).await;
    let data = response.data.unwrap();
    assert_eq!(data.headers.get("x-dup").unwrap(), "one");
}

#[tokio::test]
async fn test_timeout_bounds_the_whole_execution() {
    let app = Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "too late"
        }),
    );
    let addr = serve(app).await;

    let mut request = get_request(format!("http://{}/slow", addr));
    request.timeout = Some(200);

    let response = execute_request(request).await;
    assert!(!response.success);
    assert_eq!(response.error.unwrap().code, "TIMEOUT");
}

#[tokio::test]
async fn test_cancellation_is_distinct_from_timeout() {
    let app = Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "too late"
        }),
    );
    let addr = serve(app).await;

    let cancel = CancellationToken::new();
    let request = get_request(format!("http://{}/slow", addr));
    let handle = tokio::spawn(execute_request_cancellable(request, cancel.clone()));

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    let response = handle.await.unwrap();
    assert!(!response.success);
    assert_eq!(response.error.unwrap().code, "CANCELLED");
}

#[tokio::test]
async fn test_connection_refused_maps_to_connection_failed() {
    // Bind to learn a free port, then drop the listener before dialling.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let response = execute_request(get_request(format!("http://{}/", addr))).await;
    assert!(!response.success);
    assert_eq!(response.error.unwrap().code, "CONNECTION_FAILED");
}

#[tokio::test]
async fn test_redirect_without_location_is_terminal() {
    let app = Router::new().route(
        "/dangling",
        get(|| async {
            Response::builder()
                .status(StatusCode::FOUND)
                .body(Body::from("no location"))
                .unwrap()
        }),
    );
    let addr = serve(app).await;

    let response = execute_request(get_request(format!("http://{}/dangling", addr))).await;
    assert!(response.success, "error: {:?}", response.error);

    let data = response.data.unwrap();
    assert_eq!(data.status, 302);
    assert!(!data.redirected);
    assert_eq!(data.body, "no location");
}
