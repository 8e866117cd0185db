use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Recommendations and feedback
        .route("/recommendations", post(handlers::recommend))
        .route("/recommendations/stats", get(handlers::feedback_stats))
        .route(
            "/recommendations/:id/feedback",
            post(handlers::submit_feedback),
        )
        // Catalog
        .route("/perfumes", get(handlers::get_perfumes))
        .route("/perfumes/:id", get(handlers::get_perfume))
        // Model lifecycle
        .route("/model/status", get(handlers::model_status))
        .route("/model/retrain", post(handlers::retrain))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
