//! The artifact record - the sole entity of the gallery service.

use crate::{ArtifactId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A user-submitted artifact record.
///
/// Owner-supplied content fields (title, description, media reference, ...)
/// are opaque to the service and carried in `fields` unchanged. The like
/// counter and liker set are server-managed: they are only mutated by the
/// like reconciliation logic, never written from request payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Artifact {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub artifact_id: ArtifactId,
    /// Owner identity, set at creation and used for owner-scoped queries.
    pub owner_email: String,
    /// Denormalized like counter; invariant: `likes == liked_by.len()`.
    pub likes: i32,
    /// Viewer identities that currently have this artifact liked. No duplicates.
    pub liked_by: Vec<String>,
    /// Opaque owner-supplied fields, passed through unchanged.
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub fields: Map<String, Value>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl Artifact {
    /// Create a new artifact for an owner with the given opaque fields.
    /// Fresh artifacts start with zero likes and an empty liker set.
    pub fn new(owner_email: String, fields: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            artifact_id: ArtifactId::generate(),
            owner_email,
            likes: 0,
            liked_by: Vec::new(),
            fields,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the given viewer currently has this artifact liked.
    pub fn is_liked_by(&self, viewer: &str) -> bool {
        self.liked_by.iter().any(|v| v == viewer)
    }

    /// Check the denormalized-counter invariant.
    pub fn counter_consistent(&self) -> bool {
        self.likes >= 0 && self.likes as usize == self.liked_by.len()
    }
}
