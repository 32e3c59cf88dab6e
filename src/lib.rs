pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use routes::build_router;
pub use state::AppState;
