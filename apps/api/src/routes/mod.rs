pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::certificate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Certificate API
        .route(
            "/api/v1/certificates/:student_id/generate",
            post(handlers::handle_generate),
        )
        .route(
            "/api/v1/certificates/:student_id/download",
            get(handlers::handle_download),
        )
        .route(
            "/api/v1/certificates/:student_id/status",
            get(handlers::handle_status),
        )
        .with_state(state)
}
