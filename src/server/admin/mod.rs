mod groups;
mod tokens;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // User routes
        .route("/users", post(users::create_user).get(users::list_users))
        .route("/users/{id}", get(users::get_user).delete(users::delete_user))
        .route(
            "/users/{id}/tokens",
            get(users::list_user_tokens).post(users::create_user_token),
        )
        // Group routes
        .route("/groups", post(groups::create_group).get(groups::list_groups))
        .route(
            "/groups/{id}",
            get(groups::get_group).delete(groups::delete_group),
        )
        .route("/groups/{id}/members", get(groups::list_members))
        .route(
            "/groups/{id}/members/{user_id}",
            put(groups::put_member).delete(groups::delete_member),
        )
        // Token routes
        .route("/tokens", get(tokens::list_tokens))
        .route(
            "/tokens/{id}",
            get(tokens::get_token).delete(tokens::delete_token),
        )
}
