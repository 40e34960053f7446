//! Server-rendered pages and the social action endpoint.

mod actions;
mod docs;
mod render;
mod repositories;

use std::sync::Arc;

use axum::{
    Router,
    extract::FromRequestParts,
    http::{
        StatusCode,
        header::{ACCEPT, CONTENT_TYPE, LOCATION},
        request::Parts,
    },
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};

use crate::auth::{AuthError, CurrentPrincipal};
use crate::policy::{Denial, Located, Principal, locate, scope};
use crate::server::AppState;
use crate::server::response::{ApiError, StoreResultExt};
use crate::store::Store;

pub fn web_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/new", get(repositories::new_repository))
        .route("/repositories", post(repositories::create_repository))
        .route("/{owner}/{repo}", get(repositories::show_repository))
        .route(
            "/{owner}/{repo}/action",
            post(actions::create_action).delete(actions::delete_action),
        )
        .route("/{owner}/{repo}/{doc}", get(docs::show_doc))
}

/// How the client wants the response rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Html,
    Script,
}

impl Format {
    /// `format=js` in the query string, or an `Accept` header naming
    /// javascript, selects the script format.
    #[must_use]
    pub fn detect(parts: &Parts) -> Self {
        let in_query = parts
            .uri
            .query()
            .is_some_and(|q| q.split('&').any(|pair| pair == "format=js"));

        let in_accept = parts
            .headers
            .get(ACCEPT)
            .and_then(|h| h.to_str().ok())
            .is_some_and(|accept| accept.contains("javascript"));

        if in_query || in_accept {
            Self::Script
        } else {
            Self::Html
        }
    }
}

/// Per-request context shared by every page handler.
pub struct WebRequest {
    pub principal: Principal,
    pub format: Format,
    return_to: String,
    sign_in_path: String,
}

impl FromRequestParts<Arc<AppState>> for WebRequest {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentPrincipal(principal) = CurrentPrincipal::from_request_parts(parts, state).await?;

        let return_to = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), |pq| pq.as_str().to_string());

        Ok(Self {
            principal,
            format: Format::detect(parts),
            return_to,
            sign_in_path: state.sign_in_path.clone(),
        })
    }
}

impl WebRequest {
    /// Turns a denial into the response for this request's format.
    #[must_use]
    pub fn reject(&self, denial: Denial) -> WebError {
        self.reject_to(denial, &self.return_to)
    }

    /// Like [`WebRequest::reject`], sending the user back to `return_to`
    /// after sign-in.
    #[must_use]
    pub fn reject_to(&self, denial: Denial, return_to: &str) -> WebError {
        match (denial, self.format) {
            (Denial::AuthenticationRequired, Format::Html) => WebError::Redirect(format!(
                "{}?return_to={}",
                self.sign_in_path,
                urlencoding::encode(return_to)
            )),
            (Denial::AuthenticationRequired, Format::Script) => {
                WebError::Page(StatusCode::UNAUTHORIZED, "Authentication required".to_string())
            }
            (Denial::Forbidden, _) => WebError::Page(
                StatusCode::FORBIDDEN,
                "You are not authorized to perform this action".to_string(),
            ),
            (Denial::NotFound, _) => {
                WebError::Page(StatusCode::NOT_FOUND, "Page not found".to_string())
            }
        }
    }
}

#[derive(Debug)]
pub enum WebError {
    /// 302 to the given location.
    Redirect(String),
    Page(StatusCode, String),
}

impl From<ApiError> for WebError {
    fn from(e: ApiError) -> Self {
        Self::Page(e.status, e.message)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect(location) => redirect(&location),
            Self::Page(status, message) => {
                (status, Html(render::error_page(status, &message))).into_response()
            }
        }
    }
}

/// Resolves `/{owner}/{repo}` for the requesting principal, scoped to the
/// owner. `None` when the pair does not resolve.
fn resolve(
    store: &dyn Store,
    web: &WebRequest,
    owner_slug: &str,
    repo_slug: &str,
) -> Result<Option<(Principal, Located)>, WebError> {
    let Some(located) =
        locate(store, owner_slug, repo_slug).api_err("Failed to look up repository")?
    else {
        return Ok(None);
    };
    let principal = scope(store, web.principal.clone(), &located.owner)
        .api_err("Failed to look up membership")?;
    Ok(Some((principal, located)))
}

/// A 302 Found. axum's `Redirect::to` answers 303.
fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

fn script(body: String) -> Response {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/javascript; charset=utf-8")],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(uri: &str, accept: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(accept) = accept {
            builder = builder.header(ACCEPT, accept);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_format_from_query_or_accept() {
        assert_eq!(
            Format::detect(&parts("/a/b/action?action_type=star&format=js", None)),
            Format::Script
        );
        assert_eq!(
            Format::detect(&parts("/a/b/action", Some("text/javascript, */*"))),
            Format::Script
        );
        assert_eq!(
            Format::detect(&parts("/a/b/action?format=json", Some("text/html"))),
            Format::Html
        );
    }

    #[test]
    fn test_sign_in_redirect_keeps_return_path() {
        let request = WebRequest {
            principal: Principal::Anonymous,
            format: Format::Html,
            return_to: "/writers/handbook".to_string(),
            sign_in_path: "/account/sign_in".to_string(),
        };

        match request.reject(Denial::AuthenticationRequired) {
            WebError::Redirect(location) => {
                assert_eq!(location, "/account/sign_in?return_to=%2Fwriters%2Fhandbook");
            }
            other => panic!("expected redirect, got {other:?}"),
        }

        let script = WebRequest {
            format: Format::Script,
            ..request
        };
        assert!(matches!(
            script.reject(Denial::AuthenticationRequired),
            WebError::Page(StatusCode::UNAUTHORIZED, _)
        ));
    }
}
