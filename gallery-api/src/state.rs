//! Shared application state for the Axum router.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::IdentityVerifier;
use crate::db::DbClient;

/// Application-wide state shared across all routes.
///
/// Both collaborators are constructed at startup and injected here; nothing
/// is held as ambient module state.
#[derive(Clone)]
pub struct AppState {
    /// Store gateway over the artifacts table.
    pub db: DbClient,
    /// Bearer-token verifier for owner-scoped routes.
    pub verifier: Arc<IdentityVerifier>,
}

impl FromRef<AppState> for DbClient {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for Arc<IdentityVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.verifier.clone()
    }
}
