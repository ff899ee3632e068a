//! Static assets compiled into the binary.

use axum::{http::header, response::IntoResponse};

const APP_JS: &str = include_str!("../../static/app.js");
const SITE_CSS: &str = include_str!("../../static/site.css");

pub async fn app_js() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "public, max-age=300"),
        ],
        APP_JS,
    )
}

pub async fn site_css() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/css; charset=utf-8"),
            (header::CACHE_CONTROL, "public, max-age=300"),
        ],
        SITE_CSS,
    )
}
