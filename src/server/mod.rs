pub mod access;
mod admin;
mod api;
pub mod dto;
pub mod response;
mod router;
pub mod validation;
mod web;

pub use admin::admin_router;
pub use api::api_router;
pub use router::{AppState, create_router};
pub use web::{Format, WebError, WebRequest, web_router};
