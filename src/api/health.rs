use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub gateway: String,
    pub gateway_mode: String,
    pub payment_methods: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let version = env!("CARGO_PKG_VERSION").to_string();

    let gateway_mode = if state.sandbox { "sandbox" } else { "live" };

    let response = HealthResponse {
        status: "healthy".to_string(),
        version,
        environment: state.environment.clone(),
        gateway: state.gateway.name().to_string(),
        gateway_mode: gateway_mode.to_string(),
        payment_methods: state.catalogue.len(),
    };

    Json(response)
}
