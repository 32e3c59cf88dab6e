use std::net::SocketAddr;

use axum::Router;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use stk_gateway::{build_router, AppConfig, AppState};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    let port = config.port;

    tracing::info!("🔧 Config: {}", config.config_info());

    let app_state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("❌ Failed to initialize services: {}", e);
            std::process::exit(1);
        }
    };

    verify_credentials(&app_state).await;

    let app = build_router(app_state);
    start_server(app, port).await;
}

// A failed check is only logged; each STK push fetches its own token anyway.
async fn verify_credentials(state: &AppState) {
    let token_cache = state.mpesa_service.token_cache();
    if !token_cache.has_credentials() {
        tracing::warn!("CONSUMER_KEY/CONSUMER_SECRET not set, STK pushes will fail");
        return;
    }

    match token_cache.get_token().await {
        Ok(_) => tracing::info!("✅ M-Pesa access token obtained"),
        Err(e) => tracing::warn!("Could not obtain M-Pesa access token at startup: {}", e),
    }
}

async fn start_server(app: Router, port: u16) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!("🚀 Server starting on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
