//! REST API Routes Module
//!
//! Route handlers and the top-level router assembly:
//! - Artifact CRUD and like routes under /artifacts
//! - Root liveness string and /health/* checks
//! - OpenAPI document at /openapi.json (+ Swagger UI behind the
//!   `swagger-ui` feature)
//! - CORS support for the browser frontend

pub mod artifact;
pub mod health;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::auth::IdentityVerifier;
use crate::config::ApiConfig;
use crate::db::DbClient;
use crate::openapi::ApiDoc;
use crate::state::AppState;

// Re-export route creation functions for convenience
pub use artifact::create_router as artifact_router;
pub use health::create_router as health_router;

// ============================================================================
// OPENAPI ENDPOINTS
// ============================================================================

/// Handler for /openapi.json endpoint.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// ============================================================================
// ROUTER ASSEMBLY
// ============================================================================

/// Create the complete API router.
///
/// The store client and identity verifier are constructed by the caller and
/// injected here; route handlers receive them through [`AppState`]. The two
/// owner-scoped list routes enforce the bearer guard inside their handlers -
/// there is no blanket auth layer, matching the deliberately open contract
/// of the remaining routes.
pub fn create_api_router(
    db: DbClient,
    verifier: Arc<IdentityVerifier>,
    api_config: &ApiConfig,
) -> Router {
    let state = AppState {
        db: db.clone(),
        verifier,
    };

    let router = Router::new()
        .route("/", get(health::root))
        .nest("/artifacts", artifact::create_router())
        .with_state(state)
        // Health checks (stateful on their own probe state)
        .nest("/health", health::create_router(db))
        // OpenAPI spec
        .route("/openapi.json", get(openapi_json));

    // Add Swagger UI if the swagger-ui feature is enabled
    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa_swagger_ui::SwaggerUi;
        router.merge(SwaggerUi::new("/swagger-ui").url("/openapi.json", ApiDoc::openapi()))
    };

    let cors = build_cors_layer(api_config);

    router.layer(TraceLayer::new_for_http()).layer(cors)
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        // Development mode: allow all origins
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any).allow_headers(Any)
    } else {
        // Production mode: only allow configured origins
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}
