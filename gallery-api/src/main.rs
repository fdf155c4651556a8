//! Gallery API Server Entry Point
//!
//! Bootstraps configuration, connects the store, and starts the Axum HTTP
//! server.

use std::sync::Arc;

use gallery_api::{
    create_api_router, resolve_bind_addr, ApiConfig, ApiError, ApiResult, CredentialError,
    DbClient, DbConfig, IdentityVerifier, ServiceCredential,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ApiResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let db_config = DbConfig::from_env();
    let db = DbClient::from_config(&db_config)?;
    db.init_schema().await?;

    let verifier = Arc::new(load_verifier()?);
    let api_config = ApiConfig::from_env();

    let app = create_api_router(db, verifier, &api_config);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting artifact gallery server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

/// Load the identity verifier from the environment.
///
/// A missing credential falls back to an insecure development credential
/// with a loud warning; a malformed credential is a startup error.
fn load_verifier() -> ApiResult<IdentityVerifier> {
    match IdentityVerifier::from_env() {
        Ok(verifier) => Ok(verifier),
        Err(CredentialError::MissingEnv { var }) => {
            tracing::warn!(
                "{} not set - using an insecure development credential. \
                 Owner-scoped routes will only accept locally minted tokens. \
                 Set {} before deploying.",
                var,
                var
            );
            let credential = ServiceCredential::new(
                "gallery-identity".to_string(),
                "INSECURE_DEFAULT_CREDENTIAL_CHANGE_IN_PRODUCTION".to_string(),
            )?;
            Ok(IdentityVerifier::new(credential))
        }
        Err(err) => Err(err.into()),
    }
}
