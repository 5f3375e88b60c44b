//! HTTP router.
//!
//! Layer stack (outermost → innermost):
//! 1. Request tracing → 2. Concurrency limit (pipeline routes only) → 3. Body limit

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the service router.
///
/// `/api/simplify-report` is kept as an alias of `/api/simplify`.
/// Both share one concurrency budget.
pub fn api_router(ctx: ApiContext) -> Router {
    let pipeline_routes = Router::new()
        .route("/api/simplify", post(endpoints::simplify::simplify))
        .route("/api/simplify-report", post(endpoints::simplify::simplify))
        .layer(DefaultBodyLimit::max(ctx.max_upload_bytes))
        .layer(GlobalConcurrencyLimitLayer::new(ctx.max_concurrent_requests));

    Router::new()
        .route("/", get(endpoints::health::banner))
        .route("/api/health", get(endpoints::health::check))
        .merge(pipeline_routes)
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
}
