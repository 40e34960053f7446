use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use crate::auth::CurrentPrincipal;
use crate::error::Error;
use crate::policy::{Abilities, Action};
use crate::server::AppState;
use crate::server::access::{create_repository as create, require, resolve};
use crate::server::dto::{CreateRepositoryRequest, RepositoryResponse, UpdateRepositoryRequest};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::{parse_privacy, validate_description, validate_name};
use crate::social;
use crate::types::ActionType;

pub async fn create_repository(
    CurrentPrincipal(principal): CurrentPrincipal,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRepositoryRequest>,
) -> impl IntoResponse {
    let located = create(state.store.as_ref(), principal, req)?;
    let response = RepositoryResponse::new(&located.owner, located.repository);

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

pub async fn get_repository(
    CurrentPrincipal(principal): CurrentPrincipal,
    State(state): State<Arc<AppState>>,
    Path((owner, repo)): Path<(String, String)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let (principal, located) = resolve(store, principal, &owner, &repo)?;

    require(&principal, Action::ViewRepository, &located)?;

    let abilities = Abilities::evaluate(&principal, &located.owner, &located.repository);
    let social = ActionType::ALL
        .into_iter()
        .map(|action_type| social::current(store, &principal, &located, action_type))
        .collect::<Result<Vec<_>, _>>()
        .api_err("Failed to load social state")?;

    let mut response = RepositoryResponse::new(&located.owner, located.repository);
    response.abilities = Some(abilities);
    response.social = social.into_iter().map(Into::into).collect();

    Ok::<_, ApiError>(Json(ApiResponse::success(response)))
}

pub async fn update_repository(
    CurrentPrincipal(principal): CurrentPrincipal,
    State(state): State<Arc<AppState>>,
    Path((owner, repo)): Path<(String, String)>,
    Json(req): Json<UpdateRepositoryRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let (principal, located) = resolve(store, principal, &owner, &repo)?;

    require(&principal, Action::AdministerRepository, &located)?;

    let mut repository = located.repository;
    if let Some(name) = req.name {
        validate_name(&name, "Repository").map_err(ApiError::bad_request)?;
        repository.name = name.trim().to_string();
    }
    if let Some(description) = req.description {
        let description = description.trim().to_string();
        validate_description(Some(&description)).map_err(ApiError::bad_request)?;
        repository.description = Some(description).filter(|d| !d.is_empty());
    }
    if req.privacy.is_some() {
        repository.privacy =
            parse_privacy(req.privacy.as_deref()).map_err(ApiError::bad_request)?;
    }
    if let Some(has_toc) = req.has_toc {
        repository.has_toc = has_toc;
    }
    repository.updated_at = Utc::now();

    store
        .update_repository(&repository)
        .api_err("Failed to update repository")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(RepositoryResponse::new(
        &located.owner,
        repository,
    ))))
}

pub async fn delete_repository(
    CurrentPrincipal(principal): CurrentPrincipal,
    State(state): State<Arc<AppState>>,
    Path((owner, repo)): Path<(String, String)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let (principal, located) = resolve(store, principal, &owner, &repo)?;

    require(&principal, Action::AdministerRepository, &located)?;

    match store.delete_repository(&located.repository.id) {
        Ok(_) => {}
        Err(Error::NotFound) => return Err(ApiError::not_found("Repository not found")),
        Err(e) => {
            tracing::error!("Failed to delete repository: {e}");
            return Err(ApiError::internal("Failed to delete repository"));
        }
    }

    tracing::info!(repository = %located.repository.id, "repository deleted");

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
