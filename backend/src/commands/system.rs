use axum::Json;
use serde_json::{json, Value};

const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn ping() -> Json<Value> {
    Json(json!({ "success": true, "data": { "status": "ok", "version": CURRENT_VERSION } }))
}
