use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::admin::admin_router;
use super::api::api_router;
use super::web::web_router;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Where anonymous visitors are sent to authenticate.
    pub sign_in_path: String,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, sign_in_path: impl Into<String>) -> Self {
        Self {
            store,
            sign_in_path: sign_in_path.into(),
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        path = uri.path(),
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "request"
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/admin", admin_router())
        .nest("/api/v1", api_router())
        .merge(web_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
