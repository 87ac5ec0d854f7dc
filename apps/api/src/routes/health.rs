use axum::Json;
use serde_json::{json, Value};

use crate::models::template::{TemplateInfo, TemplateStyle};

pub const SERVICE_NAME: &str = "Slideflow API";
pub const API_VERSION: &str = "1.0.0";

/// GET /
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "Welcome to Slideflow API"
    }))
}

/// GET /api/health
/// Returns a simple status object with service version and unix timestamp.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": API_VERSION,
        "timestamp": chrono::Utc::now().timestamp()
    }))
}

/// GET /api/templates
pub async fn templates_handler() -> Json<Vec<TemplateInfo>> {
    Json(TemplateStyle::ALL.iter().map(TemplateStyle::info).collect())
}
