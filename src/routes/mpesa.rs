use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::mpesa_handlers;
use crate::state::AppState;

pub fn mpesa_routes() -> Router<AppState> {
    Router::new()
        .route("/stkpush", post(mpesa_handlers::initiate_stk_push))
        .route("/callback", post(mpesa_handlers::mpesa_callback))
        .route("/status", get(mpesa_handlers::check_transaction_status))
}
