pub mod app_state;
pub mod image;
pub mod resolver;
pub mod storage;
