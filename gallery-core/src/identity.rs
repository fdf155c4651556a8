//! Identity types for gallery entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Artifact identifier using UUIDv7 for timestamp-sortable IDs.
/// UUIDv7 embeds a Unix timestamp, making IDs naturally sortable by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(Uuid);

impl ArtifactId {
    /// Wrap an existing UUID (e.g. one supplied in a request path).
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a fresh timestamp-sortable ArtifactId.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Borrow the underlying UUID (needed for store query parameters).
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Consume into the underlying UUID.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for ArtifactId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = ArtifactId::generate();
        let b = ArtifactId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_matches_uuid() {
        let uuid = Uuid::now_v7();
        let id = ArtifactId::new(uuid);
        assert_eq!(id.to_string(), uuid.to_string());
    }

    #[test]
    fn test_serde_transparent() -> Result<(), serde_json::Error> {
        let id = ArtifactId::generate();
        let json = serde_json::to_string(&id)?;
        assert_eq!(json, format!("\"{}\"", id));

        let back: ArtifactId = serde_json::from_str(&json)?;
        assert_eq!(back, id);
        Ok(())
    }
}
