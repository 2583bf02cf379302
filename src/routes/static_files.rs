//! Embedded front-end serving with SPA fallback.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "frontend/"]
struct FrontendAssets;

/// Serves an embedded asset for the request path.
///
/// Lookup order: the exact path, `<path>.html`, `<path>/index.html`, then
/// `index.html` so client-side routes resolve to the SPA shell.
pub async fn serve_static(req: Request<Body>) -> impl IntoResponse {
    let path = req.uri().path().trim_start_matches('/');

    let candidates = [
        path.to_string(),
        format!("{}.html", path),
        format!("{}/index.html", path),
        "index.html".to_string(),
    ];

    for candidate in &candidates {
        if let Some(asset) = FrontendAssets::get(candidate) {
            return asset_response(candidate, &asset.data);
        }
    }

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Body::from("Not Found"))
        .unwrap_or_else(|_| StatusCode::NOT_FOUND.into_response())
}

fn asset_response(path: &str, data: &[u8]) -> Response<Body> {
    let mime = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime)
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .body(Body::from(data.to_vec()))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
