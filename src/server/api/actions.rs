use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::auth::CurrentPrincipal;
use crate::server::AppState;
use crate::server::access::resolve;
use crate::server::response::{ApiError, ApiResponse};
use crate::social::{self, Fragment};
use crate::types::ActionType;

fn parse_action_type(value: &str) -> Result<ActionType, ApiError> {
    ActionType::parse(value)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown action type: {value}")))
}

pub async fn toggle_action(
    CurrentPrincipal(principal): CurrentPrincipal,
    State(state): State<Arc<AppState>>,
    Path((owner, repo, action_type)): Path<(String, String, String)>,
) -> impl IntoResponse {
    let action_type = parse_action_type(&action_type)?;
    let store = state.store.as_ref();
    let (principal, located) = resolve(store, principal, &owner, &repo)?;

    let fragment: Fragment = social::toggle(store, &principal, &located, action_type)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(fragment)))
}

pub async fn untoggle_action(
    CurrentPrincipal(principal): CurrentPrincipal,
    State(state): State<Arc<AppState>>,
    Path((owner, repo, action_type)): Path<(String, String, String)>,
) -> impl IntoResponse {
    let action_type = parse_action_type(&action_type)?;
    let store = state.store.as_ref();
    let (principal, located) = resolve(store, principal, &owner, &repo)?;

    let fragment = social::untoggle(store, &principal, &located, action_type)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(fragment)))
}
