use axum::{extract::State, http::Method, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod mpesa;

pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    let pages = ServeDir::new(&app_state.config.static_dir);
    let assets = ServeDir::new(&app_state.config.assets_dir);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", mpesa::mpesa_routes())
        .nest_service("/assets", assets)
        .fallback_service(pages)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "stk-gateway",
        "environment": state.config.daraja_environment,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
