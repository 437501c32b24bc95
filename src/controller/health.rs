use axum::{routing::get, Json};
use serde::Serialize;

use crate::service::app_state::{create_state_router, StateRouter};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub fn create_health_router() -> StateRouter {
    create_state_router().route("/health", get(get_health))
}
