use std::process;

use config::load_config;
use controller::create_app;
use service::app_state::create_app_state;

use cyder_tools::log::{error, info, warn, LocalLogger};

mod config;
mod controller;
mod service;
mod utils;

#[tokio::main]
async fn main() {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };
    LocalLogger::init(&config.log_level);

    let app_state = create_app_state(&config);
    let bucket = app_state.images.bucket().to_string();
    info!(
        "using {:?} storage with bucket {}",
        app_state.storage.get_storage_type(),
        bucket
    );
    match app_state.storage.check_connection(&bucket).await {
        Ok(()) => info!("storage connection verified"),
        Err(e) if e.is_bucket_not_found() => {
            warn!("bucket {} does not exist yet, it will be created on first use", bucket)
        }
        Err(e) => {
            error!("failed to connect to storage: {}", e);
            process::exit(1);
        }
    }

    let addr = format!("{}:{}", &config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to bind {}: {}", addr, e);
            process::exit(1);
        }
    };
    info!("server start at {}", &addr);

    if let Err(e) = axum::serve(listener, create_app(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("server error: {}", e);
        process::exit(1);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("shutdown signal received");
}
