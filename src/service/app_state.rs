use std::sync::Arc;

use axum::Router;

use crate::config::FinalConfig;
use crate::service::image::ImageService;
use crate::service::storage::{new_storage, Storage};

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub images: ImageService,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, bucket: String) -> Self {
        Self {
            images: ImageService::new(storage.clone(), bucket),
            storage,
        }
    }
}

pub fn create_app_state(config: &FinalConfig) -> Arc<AppState> {
    let storage = new_storage(&config.storage);
    let bucket = config.storage.bucket_name(&config.bucket);
    Arc::new(AppState::new(storage, bucket))
}

pub type StateRouter = Router<Arc<AppState>>;

pub fn create_state_router() -> StateRouter {
    Router::<Arc<AppState>>::new()
}
