pub mod questionnaires;
pub mod sessions;

use axum::response::Html;
use axum::Json;
use serde_json::{json, Value};

const INDEX_HTML: &str = include_str!("../../../assets/index.html");

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
