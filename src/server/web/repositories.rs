use std::sync::Arc;

use axum::{
    Form,
    extract::{Path, State, rejection::FormRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use super::render::{self, RepositoryPage};
use super::{WebError, WebRequest, redirect};
use crate::policy::{Abilities, Action, Denial};
use crate::server::AppState;
use crate::server::access::{CreateError, creatable_owners, create_repository as create, require};
use crate::server::dto::CreateRepositoryRequest;
use crate::server::response::StoreResultExt;
use crate::social;
use crate::types::ActionType;

pub async fn new_repository(
    web: WebRequest,
    State(state): State<Arc<AppState>>,
) -> Result<Response, WebError> {
    if web.principal.is_anonymous() {
        return Err(web.reject(Denial::AuthenticationRequired));
    }

    let owners = creatable_owners(state.store.as_ref(), &web.principal)
        .api_err("Failed to list owners")?;

    Ok(Html(render::new_repository_page(&owners)).into_response())
}

pub async fn create_repository(
    web: WebRequest,
    State(state): State<Arc<AppState>>,
    form: Result<Form<CreateRepositoryRequest>, FormRejection>,
) -> Result<Response, WebError> {
    if web.principal.is_anonymous() {
        return Err(web.reject_to(Denial::AuthenticationRequired, "/new"));
    }

    let Form(req) =
        form.map_err(|e| WebError::Page(StatusCode::UNPROCESSABLE_ENTITY, e.body_text()))?;

    match create(state.store.as_ref(), web.principal.clone(), req) {
        Ok(located) => Ok(redirect(&located.owner.repository_path(&located.repository))),
        Err(CreateError::Denied(denial)) => Err(web.reject_to(denial, "/new")),
        Err(CreateError::UnknownOwner) => {
            Err(WebError::Page(StatusCode::NOT_FOUND, "Owner not found".to_string()))
        }
        Err(CreateError::Invalid(message)) => {
            Err(WebError::Page(StatusCode::UNPROCESSABLE_ENTITY, message))
        }
        Err(CreateError::Duplicate) => Err(WebError::Page(
            StatusCode::UNPROCESSABLE_ENTITY,
            "A repository with this path already exists".to_string(),
        )),
        Err(CreateError::Store(e)) => {
            tracing::error!("Failed to create repository: {e}");
            Err(WebError::Page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create repository".to_string(),
            ))
        }
    }
}

pub async fn show_repository(
    web: WebRequest,
    State(state): State<Arc<AppState>>,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<Response, WebError> {
    let store = state.store.as_ref();
    let Some((principal, located)) = super::resolve(store, &web, &owner, &repo)? else {
        return Err(web.reject(Denial::NotFound));
    };

    require(&principal, Action::ViewRepository, &located).map_err(|d| web.reject(d))?;

    let abilities = Abilities::evaluate(&principal, &located.owner, &located.repository);
    let docs = store
        .list_docs(&located.repository.id)
        .api_err("Failed to list docs")?;
    let social = ActionType::ALL
        .into_iter()
        .map(|action_type| social::current(store, &principal, &located, action_type))
        .collect::<Result<Vec<_>, _>>()
        .api_err("Failed to load social state")?;

    let page = RepositoryPage {
        located: &located,
        abilities,
        docs: &docs,
        social: &social,
    };

    Ok(Html(render::repository_page(&page)).into_response())
}
