//! Gallery Core - Entity Types
//!
//! Data types and the like-reconciliation model for the artifact gallery
//! service. The API crate depends on this; everything here is free of I/O.

pub mod artifact;
pub mod identity;
pub mod like;

pub use artifact::Artifact;
pub use identity::{ArtifactId, Timestamp};
pub use like::{reconcile_like, LikeOutcome};
