//! Gallery API - REST API Layer
//!
//! Axum-based HTTP service over the artifact store. Exposes artifact CRUD,
//! the like/unlike toggle, and owner-scoped queries gated by bearer-token
//! identity verification. The store gateway and identity verifier are
//! constructed at startup and injected into the router; nothing is ambient.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod types;

// Re-export commonly used types
pub use auth::{
    authorize_owner_scope, Claims, CredentialError, IdentityVerifier, Principal,
    ServiceCredential,
};
pub use config::{resolve_bind_addr, ApiConfig};
pub use db::{DbClient, DbConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use state::AppState;
pub use types::*;
