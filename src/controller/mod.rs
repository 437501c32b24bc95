use std::sync::Arc;

use axum::{http, response::IntoResponse, Router};
use health::create_health_router;
use image::create_image_router;

use crate::service::app_state::{create_state_router, AppState, StateRouter};

mod error;
mod health;
mod image;

pub use error::BaseError;

pub fn create_router() -> StateRouter {
    create_state_router()
        .merge(create_image_router())
        .merge(create_health_router())
}

pub fn create_app(app_state: Arc<AppState>) -> Router {
    create_router().fallback(handle_404).with_state(app_state)
}

pub async fn handle_404() -> impl IntoResponse {
    (http::StatusCode::NOT_FOUND, "not found")
}
