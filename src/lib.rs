//! # BookLab
//!
//! A documentation server: repositories of docs owned by users or groups,
//! with role-based access and star/watch toggles. Usable both as a
//! standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! booklab = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use booklab::server::{AppState, create_router};
//! use booklab::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/booklab.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), "/account/sign_in"));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `booklab` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod policy;
pub mod server;
pub mod social;
pub mod store;
pub mod types;
