use axum::{Json, extract::Extension, response::IntoResponse};
use chrono::Utc;

use crate::app::services::AppServices;

pub async fn health(Extension(services): Extension<AppServices>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "store": services.store_kind(),
        "time": Utc::now().to_rfc3339(),
    }))
}
