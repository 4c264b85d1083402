/// Question answering endpoint.
pub mod chat;

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub collection: String,
    pub model: String,
}

/// Liveness check. Does not touch the index or the completion service.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        collection: state.rag.collection().to_string(),
        model: state.rag.model_name().to_string(),
    })
}
