//! Embedded single-page portal front-end, compiled in from `web/portal/`.

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    routing::get,
    Router,
};
use rust_embed::Embed;
use std::sync::Arc;

use crate::shared::state::AppState;

#[derive(Embed)]
#[folder = "web/portal/"]
#[prefix = ""]
struct PortalAssets;

async fn serve_portal_file(req: Request<Body>) -> Response<Body> {
    let path = req
        .uri()
        .path()
        .trim_start_matches("/portal")
        .trim_start_matches('/');

    // Unknown paths fall back to index.html so client-side routing works.
    let try_paths = [
        if path.is_empty() { "index.html" } else { path },
        "index.html",
    ];

    for try_path in try_paths {
        if let Some(content) = PortalAssets::get(try_path) {
            let mime = mime_guess::from_path(try_path).first_or_octet_stream();
            let response = Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, mime.as_ref())
                .body(Body::from(content.data.into_owned()));
            if let Ok(response) = response {
                return response;
            }
        }
    }

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Body::from("Not found"))
        .unwrap_or_default()
}

pub fn configure_portal_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/portal", get(serve_portal_file))
        .route("/portal/", get(serve_portal_file))
        .route("/portal/*path", get(serve_portal_file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_is_embedded() {
        assert!(PortalAssets::get("index.html").is_some());
    }

    #[test]
    fn test_mime_for_app_js() {
        let mime = mime_guess::from_path("app.js").first_or_octet_stream();
        assert!(mime.as_ref().contains("javascript"));
    }
}
