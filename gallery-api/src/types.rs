//! API request/response types for artifact operations.
//!
//! Wire field names follow the contract the frontend already speaks:
//! camelCase envelope fields (`likedBy`, `isLiked`, `createdAt`), with the
//! opaque owner-supplied fields flattened into the object verbatim.

use gallery_core::{Artifact, ArtifactId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// SERVER-MANAGED FIELDS
// ============================================================================

/// Envelope keys that may never be written from an opaque-fields payload.
/// Like state is owned by the reconciliation logic, identity and timestamps
/// by the store.
const PROTECTED_FIELDS: &[&str] = &[
    "artifactId",
    "email",
    "likes",
    "likedBy",
    "isLiked",
    "createdAt",
    "updatedAt",
];

/// Drop server-managed keys from an opaque-fields payload.
pub fn sanitize_fields(mut fields: Map<String, Value>) -> Map<String, Value> {
    for key in PROTECTED_FIELDS {
        fields.remove(*key);
    }
    fields
}

// ============================================================================
// REQUESTS
// ============================================================================

/// Request to create a new artifact.
///
/// Everything besides `email` is opaque owner content and is stored
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateArtifactRequest {
    /// Owner identity
    pub email: String,
    /// Opaque owner-supplied fields (title, description, media reference, ...)
    #[serde(flatten)]
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub fields: Map<String, Value>,
}

/// Request to upsert an artifact under a caller-supplied id.
///
/// Merge-set semantics: fields present here overwrite, fields absent are
/// left untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpsertArtifactRequest {
    /// Owner identity (kept unchanged when omitted)
    pub email: Option<String>,
    /// Opaque owner-supplied fields to merge in
    #[serde(flatten)]
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub fields: Map<String, Value>,
}

/// Request body for the like toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LikeRequest {
    /// Desired liked state for this viewer
    pub liked: bool,
    /// Viewer identity
    pub email: String,
}

/// Optional email query parameter (owner filter or viewer identity).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

// ============================================================================
// RESPONSES
// ============================================================================

/// Artifact as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ArtifactResponse {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub artifact_id: ArtifactId,
    /// Owner identity
    pub email: String,
    pub likes: i32,
    pub liked_by: Vec<String>,
    /// Viewer-relative annotation; present on get-by-id only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
    /// Opaque owner-supplied fields, passed through unchanged
    #[serde(flatten)]
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub fields: Map<String, Value>,
}

impl ArtifactResponse {
    /// Build a response from a store record, without viewer annotation.
    pub fn from_record(artifact: Artifact) -> Self {
        Self {
            artifact_id: artifact.artifact_id,
            email: artifact.owner_email,
            likes: artifact.likes,
            liked_by: artifact.liked_by,
            is_liked: None,
            created_at: artifact.created_at,
            updated_at: artifact.updated_at,
            fields: artifact.fields,
        }
    }

    /// Build a response annotated relative to a viewer identity.
    /// A missing viewer email annotates as not-liked.
    pub fn for_viewer(artifact: Artifact, viewer_email: Option<&str>) -> Self {
        let is_liked = viewer_email.map_or(false, |viewer| artifact.is_liked_by(viewer));
        let mut response = Self::from_record(artifact);
        response.is_liked = Some(is_liked);
        response
    }
}

/// Response to a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    /// Like counter after reconciliation
    pub likes: i32,
    /// Whether the viewer has the artifact liked after reconciliation
    pub is_liked: bool,
}

/// Response to a delete request. Zero deletions is a valid outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub deleted_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_request_flattens_opaque_fields() -> Result<(), serde_json::Error> {
        let req: CreateArtifactRequest = serde_json::from_value(json!({
            "email": "a@x.com",
            "title": "Sunset",
            "mediaUrl": "https://img.example/1.png"
        }))?;

        assert_eq!(req.email, "a@x.com");
        assert_eq!(req.fields["title"], json!("Sunset"));
        assert!(!req.fields.contains_key("email"));
        Ok(())
    }

    #[test]
    fn test_sanitize_strips_server_managed_fields() {
        let mut fields = Map::new();
        fields.insert("title".to_string(), json!("Sunset"));
        fields.insert("likes".to_string(), json!(9000));
        fields.insert("likedBy".to_string(), json!(["x@x.com"]));
        fields.insert("createdAt".to_string(), json!("2020-01-01T00:00:00Z"));

        let fields = sanitize_fields(fields);

        assert_eq!(fields.len(), 1);
        assert!(fields.contains_key("title"));
    }

    #[test]
    fn test_response_uses_camel_case_wire_names() -> Result<(), serde_json::Error> {
        let mut artifact = Artifact::new("a@x.com".to_string(), Map::new());
        artifact.liked_by.push("b@x.com".to_string());
        artifact.likes = 1;

        let response = ArtifactResponse::for_viewer(artifact, Some("b@x.com"));
        let json = serde_json::to_value(&response)?;

        assert_eq!(json["email"], json!("a@x.com"));
        assert_eq!(json["likedBy"], json!(["b@x.com"]));
        assert_eq!(json["isLiked"], json!(true));
        assert!(json.get("liked_by").is_none());
        Ok(())
    }

    #[test]
    fn test_viewer_annotation() {
        let mut artifact = Artifact::new("a@x.com".to_string(), Map::new());
        artifact.liked_by.push("b@x.com".to_string());
        artifact.likes = 1;

        let liked = ArtifactResponse::for_viewer(artifact.clone(), Some("b@x.com"));
        assert_eq!(liked.is_liked, Some(true));

        let other = ArtifactResponse::for_viewer(artifact.clone(), Some("c@x.com"));
        assert_eq!(other.is_liked, Some(false));

        // Absent viewer email annotates as false, never as missing.
        let anonymous = ArtifactResponse::for_viewer(artifact.clone(), None);
        assert_eq!(anonymous.is_liked, Some(false));

        // List responses carry no annotation at all.
        let listed = ArtifactResponse::from_record(artifact);
        assert_eq!(listed.is_liked, None);
    }

    #[test]
    fn test_opaque_fields_pass_through_response() -> Result<(), serde_json::Error> {
        let mut fields = Map::new();
        fields.insert("title".to_string(), json!("Sunset"));
        let artifact = Artifact::new("a@x.com".to_string(), fields);

        let json = serde_json::to_value(ArtifactResponse::from_record(artifact))?;
        assert_eq!(json["title"], json!("Sunset"));
        Ok(())
    }
}
