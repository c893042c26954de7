mod models;
mod handlers;
mod routes;
mod docs;
mod config;
mod clients;
mod services;
mod websocket;
mod ws;

use std::sync::Arc;
use config::Config;
use tracing::{info, error, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use std::panic;

use clients::{Collaborators, app_service_client::AppServiceClient};
use services::collab_service::CollabService;
use services::janitor::Janitor;
use ws::registry::RoomRegistry;

/// Shared state of all routes
pub struct AppState {
    pub collab: Arc<CollabService>,
}

#[tokio::main]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "colabri_grid=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });
    if config.is_development() {
        info!("Running in development mode");
    }

    // Client for permissions, users and file content
    let app_service = match AppServiceClient::new(
        config.app_service_url.clone(),
        config.service_jwt_secret.clone(),
        config.service_name.clone(),
    ) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to create app service client: {}", e);
            std::process::exit(1);
        }
    };
    if config.service_jwt_secret.is_none() {
        warn!("No SERVICE_JWT_SECRET configured - backend requests are sent unsigned");
    }

    // Collaboration engine and its janitor
    let registry = Arc::new(RoomRegistry::new(config.lock_ttl()));
    let collab = Arc::new(CollabService::new(
        registry,
        Collaborators::from_shared(app_service),
        config.presence_idle(),
        config.user_cache_ttl(),
    ));
    let janitor = Janitor::spawn(
        collab.clone(),
        config.lock_sweep_interval(),
        config.presence_sweep_interval(),
    );

    let app_state = Arc::new(AppState { collab });
    let app_routes = routes::create_app(app_state);

    // Start the HTTP/WebSocket server
    let listener = match tokio::net::TcpListener::bind(config.server_address()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", config.server_address(), e);
            std::process::exit(1);
        }
    };

    info!("🚀 Server running on http://{}", config.server_address());
    info!("📡 WebSocket available at ws://{}/ws", config.server_address());
    info!("📚 Swagger UI available at http://{}/swagger", config.server_address());

    if let Err(e) = axum::serve(listener, app_routes)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }

    janitor.shutdown();
    info!("Server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
