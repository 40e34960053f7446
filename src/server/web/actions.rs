use std::sync::Arc;

use axum::{
    Form,
    extract::{
        Path, Query, State,
        rejection::{FormRejection, QueryRejection},
    },
    http::StatusCode,
    response::Response,
};

use super::{Format, WebError, WebRequest, redirect, script};
use crate::policy::Denial;
use crate::server::AppState;
use crate::server::dto::ActionParams;
use crate::social::{self, SocialError};
use crate::types::ActionType;

pub async fn create_action(
    web: WebRequest,
    State(state): State<Arc<AppState>>,
    Path((owner, repo)): Path<(String, String)>,
    query: Result<Query<ActionParams>, QueryRejection>,
    body: Result<Form<ActionParams>, FormRejection>,
) -> Result<Response, WebError> {
    apply(web, &state, &owner, &repo, params(query, body), true)
}

pub async fn delete_action(
    web: WebRequest,
    State(state): State<Arc<AppState>>,
    Path((owner, repo)): Path<(String, String)>,
    query: Result<Query<ActionParams>, QueryRejection>,
    body: Result<Form<ActionParams>, FormRejection>,
) -> Result<Response, WebError> {
    apply(web, &state, &owner, &repo, params(query, body), false)
}

/// Query parameters win over the form body; an unreadable source counts as
/// empty.
fn params(
    query: Result<Query<ActionParams>, QueryRejection>,
    body: Result<Form<ActionParams>, FormRejection>,
) -> ActionParams {
    let query = query.map(|Query(p)| p).unwrap_or_default();
    let body = body.map(|Form(p)| p).unwrap_or_default();
    query.or(body)
}

fn apply(
    mut web: WebRequest,
    state: &AppState,
    owner: &str,
    repo: &str,
    params: ActionParams,
    active: bool,
) -> Result<Response, WebError> {
    if params.wants_script() {
        web.format = Format::Script;
    }

    let store = state.store.as_ref();
    let Some((principal, located)) = super::resolve(store, &web, owner, repo)? else {
        return Err(web.reject(Denial::NotFound));
    };
    let repository_path = located.owner.repository_path(&located.repository);

    if principal.is_anonymous() {
        return Err(web.reject_to(Denial::AuthenticationRequired, &repository_path));
    }

    let action_type = params
        .action_type
        .as_deref()
        .and_then(ActionType::parse)
        .ok_or_else(|| {
            WebError::Page(StatusCode::BAD_REQUEST, "Unknown action type".to_string())
        })?;

    let result = if active {
        social::toggle(store, &principal, &located, action_type)
    } else {
        social::untoggle(store, &principal, &located, action_type)
    };

    let fragment = match result {
        Ok(fragment) => fragment,
        Err(SocialError::Denied(denial)) => return Err(web.reject_to(denial, &repository_path)),
        Err(SocialError::Store(e)) => {
            tracing::error!(repository = %located.repository.id, "failed to update social action: {e}");
            return Err(WebError::Page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update social action".to_string(),
            ));
        }
    };

    match web.format {
        Format::Script => Ok(script(fragment.to_script())),
        Format::Html => Ok(redirect(&repository_path)),
    }
}
