//! Custom path extractor for type-safe artifact IDs.
//!
//! Unlike the standard `Path<Uuid>` extractor, `PathArtifactId` yields the
//! domain ID type directly and rejects malformed IDs with the structured
//! error body the rest of the API uses.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use gallery_core::ArtifactId;
use uuid::Uuid;

use crate::error::ApiError;

/// Extractor for the artifact id path parameter.
///
/// # Example
///
/// ```rust,ignore
/// async fn get_artifact(
///     PathArtifactId(id): PathArtifactId,
/// ) -> ApiResult<impl IntoResponse> {
///     db.artifact_get(id).await
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PathArtifactId(pub ArtifactId);

#[async_trait]
impl<S> FromRequestParts<S> for PathArtifactId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_format("id", &format!("path parameter: {}", e)))?;

        let uuid = Uuid::parse_str(&raw)
            .map_err(|_| ApiError::invalid_format("id", &format!("valid UUID, got '{}'", raw)))?;

        Ok(PathArtifactId(ArtifactId::new(uuid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use axum::{body::Body, http::Request, http::StatusCode, routing::get, Router};
    use tower::ServiceExt; // for `oneshot`

    async fn handler(PathArtifactId(id): PathArtifactId) -> String {
        id.to_string()
    }

    fn test_app() -> Router {
        Router::new().route("/artifacts/:id", get(handler))
    }

    #[tokio::test]
    async fn test_valid_uuid_is_extracted() -> Result<(), String> {
        let id = Uuid::now_v7();
        let request = Request::builder()
            .uri(format!("/artifacts/{}", id))
            .body(Body::empty())
            .map_err(|e| e.to_string())?;

        let response = test_app()
            .oneshot(request)
            .await
            .map_err(|e| format!("Request failed: {:?}", e))?;

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| format!("Failed to read body: {:?}", e))?;
        assert_eq!(body, id.to_string().as_bytes());
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_uuid_is_bad_request() -> Result<(), String> {
        let request = Request::builder()
            .uri("/artifacts/not-a-uuid")
            .body(Body::empty())
            .map_err(|e| e.to_string())?;

        let response = test_app()
            .oneshot(request)
            .await
            .map_err(|e| format!("Request failed: {:?}", e))?;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| format!("Failed to read body: {:?}", e))?;
        let error: crate::error::ApiError =
            serde_json::from_slice(&body).map_err(|e| e.to_string())?;
        assert_eq!(error.code, ErrorCode::InvalidFormat);
        Ok(())
    }
}
