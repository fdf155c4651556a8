//! OpenAPI Specification for the Gallery API
//!
//! Generates the OpenAPI document from the route annotations and schema
//! derives via utoipa.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{ApiError, ErrorCode};
use crate::routes::{artifact, health};
use crate::types::{
    ArtifactResponse, CreateArtifactRequest, DeleteResponse, LikeRequest, LikeResponse,
    UpsertArtifactRequest,
};

/// OpenAPI document for the Gallery API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Artifact Gallery API",
        version = "0.1.0",
        description = "CRUD and like operations over user-submitted artifact records",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Artifacts", description = "Artifact records with like/unlike reconciliation"),
        (name = "Health", description = "Liveness and readiness probes")
    ),
    paths(
        artifact::create_artifact,
        artifact::list_artifacts,
        artifact::list_liked_artifacts,
        artifact::get_artifact,
        artifact::upsert_artifact,
        artifact::toggle_like,
        artifact::delete_artifact,
        health::root,
        health::ping,
        health::liveness,
        health::readiness,
    ),
    components(
        schemas(
            ArtifactResponse,
            CreateArtifactRequest,
            UpsertArtifactRequest,
            LikeRequest,
            LikeResponse,
            DeleteResponse,
            ApiError,
            ErrorCode,
            health::HealthResponse,
            health::HealthStatus,
            health::HealthDetails,
            health::ComponentHealth,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the bearer security scheme used by the owner-scoped routes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_builds() {
        let openapi = ApiDoc::openapi();
        assert!(!openapi.paths.paths.is_empty());
    }

    #[test]
    fn test_security_scheme_registered() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.expect("components should exist");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[test]
    fn test_openapi_paths_exist() {
        let openapi = ApiDoc::openapi();

        assert!(openapi.paths.paths.contains_key("/artifacts"));
        assert!(openapi.paths.paths.contains_key("/artifacts/liked"));
        assert!(openapi.paths.paths.contains_key("/artifacts/{id}"));
        assert!(openapi.paths.paths.contains_key("/artifacts/{id}/like"));
        assert!(openapi.paths.paths.contains_key("/health/ready"));
    }

    #[test]
    fn test_openapi_json_serialization() -> Result<(), String> {
        let json =
            ApiDoc::openapi().to_json().map_err(|e| format!("Failed to serialize OpenAPI: {}", e))?;

        serde_json::from_str::<serde_json::Value>(&json)
            .map_err(|e| format!("Generated JSON invalid: {}", e))?;

        assert!(json.contains("Artifact Gallery API"));
        assert!(json.contains("\"bearer_auth\""));
        Ok(())
    }
}
