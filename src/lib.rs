//! HTTP inspector backend.
//!
//! Executes outbound HTTP requests on behalf of a browser-resident client,
//! following redirects manually while capturing per-phase timing, TLS
//! certificate details and size accounting, and returns the same JSON shape
//! the browser extension produces.
//!
//! The engine is exposed two ways: [`execute_request`] /
//! [`execute_request_cancellable`] for embedding (a desktop shell binds the
//! same function under its `ProxyRequest` IPC command), and an axum router
//! built by [`AppBuilder`] for the web deployment (`POST /api/proxy`,
//! `GET /api/health`).

pub mod config;
pub mod error;
pub mod infra;
pub mod proxy;
pub mod routes;
pub mod shared;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

pub use config::Config;
pub use error::ProxyError;
pub use infra::{decompress_body, DnsResolver, HickoryDnsResolver, RustlsTlsProvider, TlsProvider};
pub use proxy::{
    execute_request, execute_request_cancellable, HttpProxyService, ProxyRequest, ProxyResponse,
    ProxyService, ProxyServiceExt, RequestContext, ResponseData,
};
pub use shared::{status_text, CapturedCertInfo, DetailedTiming};

/// Builder for the application router.
///
/// ```ignore
/// use http_inspector_app::AppBuilder;
///
/// let app = AppBuilder::new()
///     .with_cors()
///     .with_static_files()
///     .build();
/// ```
pub struct AppBuilder {
    cors: bool,
    static_files: bool,
    backend_name: &'static str,
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            cors: false,
            static_files: false,
            backend_name: "rust-axum",
        }
    }

    /// Enables permissive CORS on the API routes.
    pub fn with_cors(mut self) -> Self {
        self.cors = true;
        self
    }

    /// Serves the embedded front-end as the router fallback.
    pub fn with_static_files(mut self) -> Self {
        self.static_files = true;
        self
    }

    /// Overrides the backend label reported by the health check.
    pub fn with_backend_name(mut self, name: &'static str) -> Self {
        self.backend_name = name;
        self
    }

    pub fn build(self) -> Router {
        let backend = self.backend_name;
        let mut app = Router::new()
            .route("/api/health", get(move || routes::health::health_check(backend)))
            .route("/api/proxy", post(routes::proxy::proxy_request));

        if self.static_files {
            app = app.fallback(routes::static_files::serve_static);
        }

        if self.cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            app = app.layer(cors);
        }

        app
    }

    /// Router with every feature enabled; what the server binary runs.
    pub fn build_full() -> Router {
        Self::new().with_cors().with_static_files().build()
    }

    /// API-only router for embedded scenarios where the front-end is served
    /// elsewhere.
    pub fn build_api_only() -> Router {
        Self::new().with_cors().build()
    }
}
