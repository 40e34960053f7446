use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::CurrentPrincipal;
use crate::error::Error;
use crate::policy::Action;
use crate::server::AppState;
use crate::server::access::{require, resolve};
use crate::server::dto::CreateDocRequest;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::{validate_doc_slug, validate_name};
use crate::types::Doc;

pub async fn list_docs(
    CurrentPrincipal(principal): CurrentPrincipal,
    State(state): State<Arc<AppState>>,
    Path((owner, repo)): Path<(String, String)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let (principal, located) = resolve(store, principal, &owner, &repo)?;

    require(&principal, Action::ViewRepository, &located)?;

    let docs = store
        .list_docs(&located.repository.id)
        .api_err("Failed to list docs")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(docs)))
}

pub async fn create_doc(
    CurrentPrincipal(principal): CurrentPrincipal,
    State(state): State<Arc<AppState>>,
    Path((owner, repo)): Path<(String, String)>,
    Json(req): Json<CreateDocRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let (principal, located) = resolve(store, principal, &owner, &repo)?;

    require(&principal, Action::EditRepository, &located)?;

    validate_doc_slug(&req.slug).map_err(ApiError::bad_request)?;
    validate_name(&req.title, "Document").map_err(ApiError::bad_request)?;

    let now = Utc::now();
    let doc = Doc {
        id: Uuid::new_v4().to_string(),
        repository_id: located.repository.id.clone(),
        slug: req.slug,
        title: req.title.trim().to_string(),
        body: req.body,
        created_at: now,
        updated_at: now,
    };

    match store.create_doc(&doc) {
        Ok(()) => {}
        Err(Error::AlreadyExists) => return Err(ApiError::conflict("Document already exists")),
        Err(e) => {
            tracing::error!("Failed to create doc: {e}");
            return Err(ApiError::internal("Failed to create doc"));
        }
    }

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(doc))))
}
