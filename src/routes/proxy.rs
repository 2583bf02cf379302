use axum::Json;
use std::env;

use crate::proxy::{execute_request, ProxyRequest, ProxyResponse};

/// Whether the proxy surface is switched off via the environment.
fn is_proxy_disabled() -> bool {
    env::var("DISABLE_PROXY")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

/// `POST /api/proxy`: executes the described request and returns the
/// envelope. The transport status is always 200; success and failure live
/// inside the JSON.
pub async fn proxy_request(Json(request): Json<ProxyRequest>) -> Json<ProxyResponse> {
    if is_proxy_disabled() {
        tracing::debug!("proxy disabled, rejecting request");
        return Json(ProxyResponse::error(
            "Proxy is disabled. Please use the browser extension.".to_string(),
            "PROXY_DISABLED".to_string(),
        ));
    }

    tracing::debug!(
        method = %request.method,
        url = %request.url,
        "proxying request"
    );

    let response = execute_request(request).await;

    if let Some(ref error) = response.error {
        tracing::warn!(code = %error.code, message = %error.message, "request failed");
    }

    Json(response)
}
