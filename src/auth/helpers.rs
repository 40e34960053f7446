use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;

use super::middleware::AuthError;
use super::token::{RawToken, TokenGenerator};
use crate::store::Store;
use crate::types::{Token, User};

/// What a valid token authenticates as.
#[derive(Debug)]
pub enum Credential {
    Admin(Token),
    User { token: Token, user: User },
}

impl Credential {
    #[must_use]
    pub fn token(&self) -> &Token {
        match self {
            Self::Admin(token) | Self::User { token, .. } => token,
        }
    }
}

/// Reads the token from an `Authorization` header value.
///
/// `Bearer <token>` and `Basic base64(x-token:<token>)` are accepted. No
/// header yields `None`; any other scheme or Basic username is an error.
pub fn token_from_header(header: Option<&str>) -> Result<Option<String>, AuthError> {
    let Some(header) = header else {
        return Ok(None);
    };

    if let Some(token) = header.strip_prefix("Bearer ") {
        return Ok(Some(token.trim().to_string()));
    }

    let encoded = header
        .strip_prefix("Basic ")
        .ok_or(AuthError::InvalidScheme)?;
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::InvalidToken)?;
    let credentials = String::from_utf8(decoded).map_err(|_| AuthError::InvalidToken)?;

    match credentials.split_once(':') {
        Some(("x-token", token)) => Ok(Some(token.to_string())),
        _ => Err(AuthError::InvalidToken),
    }
}

/// Checks a presented token and resolves who it acts for. A user token
/// whose account has been deleted no longer authenticates.
pub fn validate_token(store: &dyn Store, presented: &str) -> Result<Credential, AuthError> {
    let raw: RawToken = presented.parse().map_err(|_| AuthError::InvalidToken)?;

    let token = store
        .get_token_by_lookup(raw.lookup())
        .map_err(|_| AuthError::InternalError)?
        .ok_or(AuthError::InvalidToken)?;

    if !TokenGenerator::new()
        .verify(&raw, &token)
        .map_err(|_| AuthError::InternalError)?
    {
        return Err(AuthError::InvalidToken);
    }

    if token.expires_at.is_some_and(|expires_at| expires_at < Utc::now()) {
        return Err(AuthError::TokenExpired);
    }

    let credential = match (token.is_admin, token.user_id.as_deref()) {
        (true, _) => Credential::Admin(token),
        (false, Some(user_id)) => {
            let user = store
                .get_user(user_id)
                .map_err(|_| AuthError::InternalError)?
                .ok_or(AuthError::InvalidToken)?;
            Credential::User { token, user }
        }
        (false, None) => return Err(AuthError::InvalidToken),
    };

    if let Err(e) = store.update_token_last_used(&credential.token().id) {
        tracing::warn!(token = %credential.token().id, "failed to record token use: {e}");
    }

    Ok(credential)
}
