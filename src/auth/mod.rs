mod helpers;
mod middleware;
mod token;

pub use helpers::{Credential, token_from_header, validate_token};
pub use middleware::{AuthError, CurrentPrincipal, RequireAdmin};
pub use token::{IssuedToken, RawToken, TokenGenerator, TokenHolder};
