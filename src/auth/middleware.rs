use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};

use super::helpers::{Credential, token_from_header, validate_token};
use crate::policy::Principal;
use crate::server::AppState;
use crate::server::response::ApiError;
use crate::types::Token;

/// Extractor that requires an admin token.
pub struct RequireAdmin(pub Token);

/// Extractor resolving the acting principal. Requests without credentials
/// act as [`Principal::Anonymous`]; malformed or unknown credentials are
/// rejected rather than downgraded.
pub struct CurrentPrincipal(pub Principal);

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    NotAdmin,
    AdminTokenNotAllowed,
    InternalError,
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingAuth => Self::unauthorized("Authentication required"),
            AuthError::InvalidScheme => Self::unauthorized("Invalid authorization scheme"),
            AuthError::InvalidToken => Self::unauthorized("Invalid token"),
            AuthError::TokenExpired => Self::unauthorized("Token expired"),
            AuthError::NotAdmin => Self::forbidden("Admin access required"),
            AuthError::AdminTokenNotAllowed => {
                Self::forbidden("Admin tokens only reach the admin API")
            }
            AuthError::InternalError => Self::internal("Internal server error"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

fn credential(parts: &Parts, state: &AppState) -> Result<Option<Credential>, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    token_from_header(header)?
        .map(|raw| validate_token(state.store.as_ref(), &raw))
        .transpose()
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match credential(parts, state)? {
            Some(Credential::Admin(token)) => Ok(RequireAdmin(token)),
            Some(Credential::User { .. }) => Err(AuthError::NotAdmin),
            None => Err(AuthError::MissingAuth),
        }
    }
}

impl FromRequestParts<Arc<AppState>> for CurrentPrincipal {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match credential(parts, state)? {
            Some(Credential::User { user, .. }) => Ok(CurrentPrincipal(Principal::User(user))),
            Some(Credential::Admin(_)) => Err(AuthError::AdminTokenNotAllowed),
            None => Ok(CurrentPrincipal(Principal::Anonymous)),
        }
    }
}
