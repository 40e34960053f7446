mod actions;
mod docs;
mod repositories;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::server::AppState;

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/repositories", post(repositories::create_repository))
        .route(
            "/repositories/{owner}/{repo}",
            get(repositories::get_repository)
                .patch(repositories::update_repository)
                .delete(repositories::delete_repository),
        )
        .route(
            "/repositories/{owner}/{repo}/actions/{action_type}",
            put(actions::toggle_action).delete(actions::untoggle_action),
        )
        .route(
            "/repositories/{owner}/{repo}/docs",
            get(docs::list_docs).post(docs::create_doc),
        )
}
