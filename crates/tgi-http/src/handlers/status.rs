use axum::Json;
use serde_json::{json, Value};

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Telegram Channel & Group Invitation API",
        "status": "running",
    }))
}
