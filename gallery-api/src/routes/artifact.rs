//! Artifact REST API Routes
//!
//! Axum route handlers for artifact CRUD and the like toggle. Only the two
//! owner-scoped list paths (owner filter, liked-by-viewer) invoke the access
//! guard; every other route is deliberately open, matching the contract the
//! frontend was built against.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    auth::{authorize_owner_scope, IdentityVerifier},
    db::DbClient,
    error::{ApiError, ApiResult},
    extractors::PathArtifactId,
    state::AppState,
    types::{
        sanitize_fields, ArtifactResponse, CreateArtifactRequest, DeleteResponse, EmailQuery,
        LikeRequest, LikeResponse, UpsertArtifactRequest,
    },
};

/// Pull the raw Authorization header value out of the request headers.
fn bearer_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /artifacts - Create a new artifact
#[utoipa::path(
    post,
    path = "/artifacts",
    tag = "Artifacts",
    request_body = CreateArtifactRequest,
    responses(
        (status = 201, description = "Artifact created successfully", body = ArtifactResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 500, description = "Store failure", body = ApiError),
    )
)]
pub async fn create_artifact(
    State(db): State<DbClient>,
    Json(req): Json<CreateArtifactRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.email.trim().is_empty() {
        return Err(ApiError::missing_field("email"));
    }

    let artifact = db
        .artifact_create(&req.email, sanitize_fields(req.fields))
        .await?;

    Ok((StatusCode::CREATED, Json(ArtifactResponse::from_record(artifact))))
}

/// GET /artifacts - List artifacts, optionally filtered to an owner
///
/// Without an `email` query this lists everything and requires no
/// credential. With one, the caller must present a bearer token whose
/// verified email matches the requested owner.
#[utoipa::path(
    get,
    path = "/artifacts",
    tag = "Artifacts",
    params(
        ("email" = Option<String>, Query, description = "Owner filter; requires a matching bearer token"),
    ),
    responses(
        (status = 200, description = "List of artifacts", body = [ArtifactResponse]),
        (status = 401, description = "Missing or invalid credential", body = ApiError),
        (status = 403, description = "Email does not match verified identity", body = ApiError),
    ),
    security(
        (),
        ("bearer_auth" = [])
    )
)]
pub async fn list_artifacts(
    State(db): State<DbClient>,
    State(verifier): State<Arc<IdentityVerifier>>,
    headers: HeaderMap,
    Query(query): Query<EmailQuery>,
) -> ApiResult<impl IntoResponse> {
    let owner_filter = query
        .email
        .as_deref()
        .filter(|email| !email.trim().is_empty());

    let artifacts = match owner_filter {
        Some(owner_email) => {
            let principal = verifier.verify_bearer(bearer_header(&headers))?;
            authorize_owner_scope(owner_email, &principal)?;
            db.artifact_list_by_owner(owner_email).await?
        }
        None => db.artifact_list_all().await?,
    };

    let response: Vec<ArtifactResponse> = artifacts
        .into_iter()
        .map(ArtifactResponse::from_record)
        .collect();

    Ok(Json(response))
}

/// GET /artifacts/liked - List artifacts the caller has liked
///
/// Guarded: the `email` query parameter is required and must match the
/// verified identity. A failing store query degrades to an empty list
/// rather than an error on this one read path.
#[utoipa::path(
    get,
    path = "/artifacts/liked",
    tag = "Artifacts",
    params(
        ("email" = String, Query, description = "Viewer identity; must match the bearer token"),
    ),
    responses(
        (status = 200, description = "Artifacts liked by the viewer", body = [ArtifactResponse]),
        (status = 400, description = "Missing email parameter", body = ApiError),
        (status = 401, description = "Missing or invalid credential", body = ApiError),
        (status = 403, description = "Email does not match verified identity", body = ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_liked_artifacts(
    State(db): State<DbClient>,
    State(verifier): State<Arc<IdentityVerifier>>,
    headers: HeaderMap,
    Query(query): Query<EmailQuery>,
) -> ApiResult<impl IntoResponse> {
    let principal = verifier.verify_bearer(bearer_header(&headers))?;

    let viewer_email = query
        .email
        .as_deref()
        .filter(|email| !email.trim().is_empty())
        .ok_or_else(|| ApiError::missing_field("email"))?;

    authorize_owner_scope(viewer_email, &principal)?;

    // Lenient read path: a store failure yields an empty list, not a 500.
    let artifacts = match db.artifact_list_liked_by(viewer_email).await {
        Ok(artifacts) => artifacts,
        Err(err) => {
            tracing::warn!(%viewer_email, error = %err, "liked-list query failed, returning empty list");
            Vec::new()
        }
    };

    let response: Vec<ArtifactResponse> = artifacts
        .into_iter()
        .map(ArtifactResponse::from_record)
        .collect();

    Ok(Json(response))
}

/// GET /artifacts/{id} - Get an artifact with viewer-relative annotation
#[utoipa::path(
    get,
    path = "/artifacts/{id}",
    tag = "Artifacts",
    params(
        ("id" = String, Path, description = "Artifact ID"),
        ("email" = Option<String>, Query, description = "Viewer identity for the isLiked annotation"),
    ),
    responses(
        (status = 200, description = "Artifact details", body = ArtifactResponse),
        (status = 404, description = "Artifact not found", body = ApiError),
    )
)]
pub async fn get_artifact(
    State(db): State<DbClient>,
    PathArtifactId(id): PathArtifactId,
    Query(query): Query<EmailQuery>,
) -> ApiResult<impl IntoResponse> {
    let artifact = db
        .artifact_get(id)
        .await?
        .ok_or_else(|| ApiError::artifact_not_found(id))?;

    Ok(Json(ArtifactResponse::for_viewer(
        artifact,
        query.email.as_deref(),
    )))
}

/// PUT /artifacts/{id} - Merge-set upsert under a caller-supplied id
#[utoipa::path(
    put,
    path = "/artifacts/{id}",
    tag = "Artifacts",
    params(
        ("id" = String, Path, description = "Artifact ID"),
    ),
    request_body = UpsertArtifactRequest,
    responses(
        (status = 200, description = "Artifact after upsert", body = ArtifactResponse),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn upsert_artifact(
    State(db): State<DbClient>,
    PathArtifactId(id): PathArtifactId,
    Json(req): Json<UpsertArtifactRequest>,
) -> ApiResult<impl IntoResponse> {
    if let Some(email) = &req.email {
        if email.trim().is_empty() {
            return Err(ApiError::invalid_input("email cannot be empty"));
        }
    }

    let artifact = db
        .artifact_upsert(id, req.email.as_deref(), sanitize_fields(req.fields))
        .await?;

    Ok(Json(ArtifactResponse::from_record(artifact)))
}

/// PATCH /artifacts/{id}/like - Reconcile the viewer's liked state
#[utoipa::path(
    patch,
    path = "/artifacts/{id}/like",
    tag = "Artifacts",
    params(
        ("id" = String, Path, description = "Artifact ID"),
    ),
    request_body = LikeRequest,
    responses(
        (status = 200, description = "Like state after reconciliation", body = LikeResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Artifact not found", body = ApiError),
    )
)]
pub async fn toggle_like(
    State(db): State<DbClient>,
    PathArtifactId(id): PathArtifactId,
    Json(req): Json<LikeRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.email.trim().is_empty() {
        return Err(ApiError::missing_field("email"));
    }

    let outcome = db.artifact_toggle_like(id, &req.email, req.liked).await?;

    Ok(Json(LikeResponse {
        likes: outcome.likes,
        is_liked: outcome.is_liked,
    }))
}

/// DELETE /artifacts/{id} - Delete an artifact
///
/// Idempotent: deleting an unknown id reports zero deletions, not 404.
#[utoipa::path(
    delete,
    path = "/artifacts/{id}",
    tag = "Artifacts",
    params(
        ("id" = String, Path, description = "Artifact ID"),
    ),
    responses(
        (status = 200, description = "Delete result", body = DeleteResponse),
    )
)]
pub async fn delete_artifact(
    State(db): State<DbClient>,
    PathArtifactId(id): PathArtifactId,
) -> ApiResult<impl IntoResponse> {
    let deleted_count = db.artifact_delete(id).await?;

    Ok(Json(DeleteResponse { deleted_count }))
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the artifact routes router.
pub fn create_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/",
            axum::routing::post(create_artifact).get(list_artifacts),
        )
        .route("/liked", axum::routing::get(list_liked_artifacts))
        .route(
            "/:id",
            axum::routing::get(get_artifact)
                .put(upsert_artifact)
                .delete(delete_artifact),
        )
        .route("/:id/like", axum::routing::patch(toggle_like))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{FixedClock, ServiceCredential};
    use crate::db::DbConfig;
    use axum::{body::Body, http::Request, Router};
    use gallery_core::ArtifactId;
    use serde_json::{json, Map};
    use tower::ServiceExt; // for `oneshot`

    const TEST_NOW: i64 = 1704067200;

    fn test_verifier() -> Arc<IdentityVerifier> {
        let credential = ServiceCredential::new(
            "gallery-identity".to_string(),
            "route_test_secret_0123456789".to_string(),
        )
        .expect("test credential");
        Arc::new(IdentityVerifier::new(credential).with_clock(Arc::new(FixedClock(TEST_NOW))))
    }

    /// Router over a lazily-connecting pool: requests that are rejected by
    /// validation or the guard never touch the store at all.
    fn test_app(verifier: Arc<IdentityVerifier>) -> Router {
        let db = DbClient::from_config(&DbConfig {
            host: "127.0.0.1".to_string(),
            port: 1, // nothing listens here; guard paths must not connect
            ..DbConfig::default()
        })
        .expect("pool creation is lazy");

        Router::new()
            .nest("/artifacts", create_router())
            .with_state(AppState { db, verifier })
    }

    fn token_for(verifier: &IdentityVerifier, email: &str) -> String {
        verifier
            .generate_token(email.to_string(), 3600)
            .expect("token generation")
    }

    async fn send(app: Router, request: Request<Body>) -> axum::response::Response {
        app.oneshot(request).await.expect("infallible service")
    }

    #[tokio::test]
    async fn test_owner_list_without_credential_is_unauthorized() -> Result<(), String> {
        let app = test_app(test_verifier());

        let request = Request::builder()
            .uri("/artifacts?email=a@x.com")
            .body(Body::empty())
            .map_err(|e| e.to_string())?;

        let response = send(app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_owner_list_with_mismatched_identity_is_forbidden() -> Result<(), String> {
        let verifier = test_verifier();
        let token = token_for(&verifier, "b@x.com");
        let app = test_app(verifier);

        let request = Request::builder()
            .uri("/artifacts?email=a@x.com")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .map_err(|e| e.to_string())?;

        let response = send(app, request).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        Ok(())
    }

    #[tokio::test]
    async fn test_liked_list_without_credential_is_unauthorized() -> Result<(), String> {
        let app = test_app(test_verifier());

        let request = Request::builder()
            .uri("/artifacts/liked?email=a@x.com")
            .body(Body::empty())
            .map_err(|e| e.to_string())?;

        let response = send(app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_liked_list_without_email_is_bad_request() -> Result<(), String> {
        let verifier = test_verifier();
        let token = token_for(&verifier, "a@x.com");
        let app = test_app(verifier);

        let request = Request::builder()
            .uri("/artifacts/liked")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .map_err(|e| e.to_string())?;

        let response = send(app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_liked_list_with_mismatched_identity_is_forbidden() -> Result<(), String> {
        let verifier = test_verifier();
        let token = token_for(&verifier, "b@x.com");
        let app = test_app(verifier);

        let request = Request::builder()
            .uri("/artifacts/liked?email=a@x.com")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .map_err(|e| e.to_string())?;

        let response = send(app, request).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_token_is_unauthorized() -> Result<(), String> {
        let verifier = test_verifier();
        let token = token_for(&verifier, "a@x.com");

        // Same credential, clock far past expiry.
        let stale_verifier = Arc::new(
            IdentityVerifier::new(
                ServiceCredential::new(
                    "gallery-identity".to_string(),
                    "route_test_secret_0123456789".to_string(),
                )
                .expect("test credential"),
            )
            .with_clock(Arc::new(FixedClock(TEST_NOW + 86400))),
        );
        let app = test_app(stale_verifier);

        let request = Request::builder()
            .uri("/artifacts?email=a@x.com")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .map_err(|e| e.to_string())?;

        let response = send(app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_without_email_is_bad_request() -> Result<(), String> {
        let app = test_app(test_verifier());

        let request = Request::builder()
            .method("POST")
            .uri("/artifacts")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"email":"","title":"Sunset"}"#))
            .map_err(|e| e.to_string())?;

        let response = send(app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_like_without_email_is_bad_request() -> Result<(), String> {
        let app = test_app(test_verifier());
        let id = ArtifactId::generate();

        let request = Request::builder()
            .method("PATCH")
            .uri(format!("/artifacts/{}/like", id))
            .header("content-type", "application/json")
            .body(Body::from(r#"{"liked":true,"email":""}"#))
            .map_err(|e| e.to_string())?;

        let response = send(app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_artifact_id_is_bad_request() -> Result<(), String> {
        let app = test_app(test_verifier());

        let request = Request::builder()
            .uri("/artifacts/not-a-uuid")
            .body(Body::empty())
            .map_err(|e| e.to_string())?;

        let response = send(app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[test]
    fn test_create_request_validation() -> Result<(), serde_json::Error> {
        let req: CreateArtifactRequest = serde_json::from_value(json!({
            "email": "  ",
            "title": "Sunset"
        }))?;
        assert!(req.email.trim().is_empty());
        Ok(())
    }

    #[test]
    fn test_like_request_shape() -> Result<(), serde_json::Error> {
        let req: LikeRequest =
            serde_json::from_str(r#"{"liked":false,"email":"b@x.com"}"#)?;
        assert!(!req.liked);
        assert_eq!(req.email, "b@x.com");
        Ok(())
    }

    // ========================================================================
    // STORE-BACKED TESTS (require DB_TESTS=1 and a running PostgreSQL)
    // ========================================================================

    async fn db_test_client() -> Option<DbClient> {
        if std::env::var("DB_TESTS").ok().as_deref() != Some("1") {
            return None;
        }

        let db = DbClient::from_config(&DbConfig::from_env()).ok()?;
        db.init_schema().await.ok()?;
        Some(db)
    }

    async fn response_json<T: serde::de::DeserializeOwned>(
        response: axum::response::Response,
    ) -> T {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("parse json")
    }

    #[tokio::test]
    async fn test_like_cycle_db_backed() {
        let Some(db) = db_test_client().await else {
            return;
        };

        let mut fields = Map::new();
        fields.insert("title".to_string(), json!("Sunset over campus"));

        let create_response = create_artifact(
            State(db.clone()),
            Json(CreateArtifactRequest {
                email: "a@x.com".to_string(),
                fields,
            }),
        )
        .await
        .expect("create_artifact should succeed")
        .into_response();
        assert_eq!(create_response.status(), StatusCode::CREATED);
        let created: ArtifactResponse = response_json(create_response).await;
        assert_eq!(created.likes, 0);
        assert!(created.liked_by.is_empty());

        let id = created.artifact_id;

        // Like once.
        let like = db
            .artifact_toggle_like(id, "b@x.com", true)
            .await
            .expect("toggle should succeed");
        assert_eq!((like.likes, like.is_liked, like.changed), (1, true, true));

        // Like again: idempotent no-op.
        let like_again = db
            .artifact_toggle_like(id, "b@x.com", true)
            .await
            .expect("toggle should succeed");
        assert_eq!(
            (like_again.likes, like_again.is_liked, like_again.changed),
            (1, true, false)
        );

        // Viewer-relative annotation on get.
        let fetched = db
            .artifact_get(id)
            .await
            .expect("get should succeed")
            .expect("artifact exists");
        assert!(fetched.is_liked_by("b@x.com"));
        assert!(fetched.counter_consistent());

        // Unlike.
        let unlike = db
            .artifact_toggle_like(id, "b@x.com", false)
            .await
            .expect("toggle should succeed");
        assert_eq!((unlike.likes, unlike.is_liked), (0, false));

        // Unlike a viewer that never liked: no-op.
        let noop = db
            .artifact_toggle_like(id, "c@x.com", false)
            .await
            .expect("toggle should succeed");
        assert_eq!((noop.likes, noop.changed), (0, false));

        // Delete twice: second delete affects zero rows, still succeeds.
        assert_eq!(db.artifact_delete(id).await.expect("delete"), 1);
        assert_eq!(db.artifact_delete(id).await.expect("delete"), 0);

        // Toggling a deleted artifact is a 404.
        let err = db
            .artifact_toggle_like(id, "b@x.com", true)
            .await
            .expect_err("toggle on missing artifact must fail");
        assert_eq!(err.code, crate::error::ErrorCode::ArtifactNotFound);
    }

    #[tokio::test]
    async fn test_upsert_merges_fields_db_backed() {
        let Some(db) = db_test_client().await else {
            return;
        };

        let id = ArtifactId::generate();

        // Upsert on an absent id inserts under that id.
        let mut fields = Map::new();
        fields.insert("title".to_string(), json!("Old title"));
        fields.insert("description".to_string(), json!("Keep me"));
        let inserted = db
            .artifact_upsert(id, Some("a@x.com"), fields)
            .await
            .expect("upsert should insert");
        assert_eq!(inserted.artifact_id, id);
        assert_eq!(inserted.owner_email, "a@x.com");

        // Second upsert only mentions the title; description survives.
        let mut update = Map::new();
        update.insert("title".to_string(), json!("New title"));
        let merged = db
            .artifact_upsert(id, None, update)
            .await
            .expect("upsert should merge");
        assert_eq!(merged.fields["title"], json!("New title"));
        assert_eq!(merged.fields["description"], json!("Keep me"));
        assert_eq!(merged.owner_email, "a@x.com");
        assert_eq!(merged.likes, 0);

        db.artifact_delete(id).await.expect("cleanup");
    }
}
