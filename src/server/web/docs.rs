use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Response},
};

use super::{WebError, WebRequest, render};
use crate::policy::{Action, Denial};
use crate::server::AppState;
use crate::server::access::require;
use crate::server::response::StoreResultExt;

pub async fn show_doc(
    web: WebRequest,
    State(state): State<Arc<AppState>>,
    Path((owner, repo, doc)): Path<(String, String, String)>,
) -> Result<Response, WebError> {
    let store = state.store.as_ref();
    let Some((principal, located)) = super::resolve(store, &web, &owner, &repo)? else {
        return Err(web.reject(Denial::NotFound));
    };

    require(&principal, Action::ViewRepository, &located).map_err(|d| web.reject(d))?;

    let doc = store
        .get_doc(&located.repository.id, &doc)
        .api_err("Failed to get doc")?
        .ok_or_else(|| web.reject(Denial::NotFound))?;

    Ok(Html(render::doc_page(&located, &doc)).into_response())
}
