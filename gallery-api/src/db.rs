//! Artifact Store Gateway
//!
//! PostgreSQL connection pooling (deadpool-postgres) and the typed access
//! layer over the `artifacts` table. The pool is constructed explicitly at
//! startup and injected into the router state; nothing here is ambient.
//!
//! Artifacts are stored as a thin relational envelope (id, owner, like
//! state, timestamps) around a JSONB document holding the opaque
//! owner-supplied fields. The like toggle is a single conditional UPDATE so
//! concurrent toggles on the same artifact cannot lose updates.

use crate::error::{ApiError, ApiResult};
use gallery_core::{reconcile_like, Artifact, ArtifactId, LikeOutcome};
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use serde_json::{Map, Value as JsonValue};
use std::time::Duration;
use tokio_postgres::{NoTls, Row};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "gallery".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("GALLERY_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("GALLERY_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("GALLERY_DB_NAME").unwrap_or_else(|_| "gallery".to_string()),
            user: std::env::var("GALLERY_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("GALLERY_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("GALLERY_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("GALLERY_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

/// Idempotent schema bootstrap executed at startup.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS artifacts (
    artifact_id UUID PRIMARY KEY,
    owner_email TEXT NOT NULL DEFAULT '',
    likes       INTEGER NOT NULL DEFAULT 0,
    liked_by    TEXT[] NOT NULL DEFAULT '{}',
    doc         JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS artifacts_owner_email_idx ON artifacts (owner_email);
CREATE INDEX IF NOT EXISTS artifacts_liked_by_idx ON artifacts USING GIN (liked_by);
";

/// Columns returned for every artifact query.
const ARTIFACT_COLUMNS: &str =
    "artifact_id, owner_email, likes, liked_by, doc, created_at, updated_at";

// ============================================================================
// DATABASE CLIENT
// ============================================================================

/// Database client wrapping a connection pool with typed artifact operations.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> ApiResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(ApiError::from)
    }

    /// Create the artifacts table and indexes if they do not exist.
    pub async fn init_schema(&self) -> ApiResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute(SCHEMA).await?;
        Ok(())
    }

    /// Round-trip connectivity check for the readiness probe.
    pub async fn health_check(&self) -> ApiResult<()> {
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[]).await?;
        Ok(())
    }

    // ========================================================================
    // ARTIFACT OPERATIONS
    // ========================================================================

    /// Insert a new artifact for an owner with the given opaque fields.
    /// The record starts with zero likes and an empty liker set.
    pub async fn artifact_create(
        &self,
        owner_email: &str,
        fields: Map<String, JsonValue>,
    ) -> ApiResult<Artifact> {
        let conn = self.get_conn().await?;

        let id = ArtifactId::generate();
        let doc = JsonValue::Object(fields);

        let statement = format!(
            "INSERT INTO artifacts (artifact_id, owner_email, doc) \
             VALUES ($1, $2, $3) \
             RETURNING {ARTIFACT_COLUMNS}"
        );
        let row = conn
            .query_one(statement.as_str(), &[id.as_uuid(), &owner_email, &doc])
            .await?;

        Ok(row_to_artifact(&row))
    }

    /// List all artifacts, newest first. Unbounded; there is no pagination
    /// contract on this endpoint.
    pub async fn artifact_list_all(&self) -> ApiResult<Vec<Artifact>> {
        let conn = self.get_conn().await?;

        let statement =
            format!("SELECT {ARTIFACT_COLUMNS} FROM artifacts ORDER BY created_at DESC");
        let rows = conn.query(statement.as_str(), &[]).await?;

        Ok(rows.iter().map(row_to_artifact).collect())
    }

    /// List artifacts owned by the given email, newest first.
    pub async fn artifact_list_by_owner(&self, owner_email: &str) -> ApiResult<Vec<Artifact>> {
        let conn = self.get_conn().await?;

        let statement = format!(
            "SELECT {ARTIFACT_COLUMNS} FROM artifacts \
             WHERE owner_email = $1 ORDER BY created_at DESC"
        );
        let rows = conn.query(statement.as_str(), &[&owner_email]).await?;

        Ok(rows.iter().map(row_to_artifact).collect())
    }

    /// List artifacts whose liker set contains the given viewer, newest first.
    pub async fn artifact_list_liked_by(&self, viewer_email: &str) -> ApiResult<Vec<Artifact>> {
        let conn = self.get_conn().await?;

        let statement = format!(
            "SELECT {ARTIFACT_COLUMNS} FROM artifacts \
             WHERE $1::text = ANY(liked_by) ORDER BY created_at DESC"
        );
        let rows = conn.query(statement.as_str(), &[&viewer_email]).await?;

        Ok(rows.iter().map(row_to_artifact).collect())
    }

    /// Fetch a single artifact by id.
    pub async fn artifact_get(&self, id: ArtifactId) -> ApiResult<Option<Artifact>> {
        let conn = self.get_conn().await?;

        let statement = format!("SELECT {ARTIFACT_COLUMNS} FROM artifacts WHERE artifact_id = $1");
        let row = conn.query_opt(statement.as_str(), &[id.as_uuid()]).await?;

        Ok(row.as_ref().map(row_to_artifact))
    }

    /// Merge-set upsert with a caller-supplied id.
    ///
    /// An existing record keeps every field the payload does not mention
    /// (`doc || new_doc`); an absent id inserts a fresh record under that id.
    /// Like state is never touched by this path.
    pub async fn artifact_upsert(
        &self,
        id: ArtifactId,
        owner_email: Option<&str>,
        fields: Map<String, JsonValue>,
    ) -> ApiResult<Artifact> {
        let conn = self.get_conn().await?;

        let doc = JsonValue::Object(fields);

        let statement = format!(
            "INSERT INTO artifacts (artifact_id, owner_email, doc) \
             VALUES ($1, COALESCE($2, ''), $3) \
             ON CONFLICT (artifact_id) DO UPDATE SET \
                 owner_email = COALESCE($2, artifacts.owner_email), \
                 doc = artifacts.doc || EXCLUDED.doc, \
                 updated_at = now() \
             RETURNING {ARTIFACT_COLUMNS}"
        );
        let row = conn
            .query_one(statement.as_str(), &[id.as_uuid(), &owner_email, &doc])
            .await?;

        Ok(row_to_artifact(&row))
    }

    /// Delete an artifact; returns the number of affected rows.
    /// Deleting an absent id affects zero rows and is not an error.
    pub async fn artifact_delete(&self, id: ArtifactId) -> ApiResult<u64> {
        let conn = self.get_conn().await?;

        let deleted = conn
            .execute("DELETE FROM artifacts WHERE artifact_id = $1", &[id.as_uuid()])
            .await?;

        Ok(deleted)
    }

    // ========================================================================
    // LIKE RECONCILIATION
    // ========================================================================

    /// Reconcile an artifact's like state with a viewer's desired state.
    ///
    /// The mutation is one conditional UPDATE - membership toggle, counter
    /// arithmetic and the membership guard all in a single statement - so
    /// two interleaved toggles on the same artifact cannot lose an update.
    /// A zero-row result means either the id is unknown (404) or the state
    /// already matches the desired state (idempotent no-op); a follow-up
    /// read disambiguates. The semantics mirror
    /// [`gallery_core::reconcile_like`] exactly.
    pub async fn artifact_toggle_like(
        &self,
        id: ArtifactId,
        viewer_email: &str,
        desired: bool,
    ) -> ApiResult<LikeOutcome> {
        let conn = self.get_conn().await?;

        let statement = if desired {
            "UPDATE artifacts SET \
                 liked_by = array_append(liked_by, $2::text), \
                 likes = likes + 1, \
                 updated_at = now() \
             WHERE artifact_id = $1 AND NOT ($2::text = ANY(liked_by)) \
             RETURNING likes"
        } else {
            "UPDATE artifacts SET \
                 liked_by = array_remove(liked_by, $2::text), \
                 likes = GREATEST(likes - 1, 0), \
                 updated_at = now() \
             WHERE artifact_id = $1 AND $2::text = ANY(liked_by) \
             RETURNING likes"
        };

        let updated = conn
            .query_opt(statement, &[id.as_uuid(), &viewer_email])
            .await?;

        if let Some(row) = updated {
            return Ok(LikeOutcome {
                likes: row.get(0),
                is_liked: desired,
                changed: true,
            });
        }

        // No row updated: unknown id, or state already matched.
        let current = conn
            .query_opt(
                "SELECT likes, liked_by FROM artifacts WHERE artifact_id = $1",
                &[id.as_uuid()],
            )
            .await?
            .ok_or_else(|| ApiError::artifact_not_found(id))?;

        let likes: i32 = current.get(0);
        let mut liked_by: Vec<String> = current.get(1);
        Ok(reconcile_like(&mut liked_by, likes, viewer_email, desired))
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

/// Map an artifacts row into the core record type.
fn row_to_artifact(row: &Row) -> Artifact {
    let doc: JsonValue = row.get("doc");
    let fields = doc.as_object().cloned().unwrap_or_default();

    Artifact {
        artifact_id: ArtifactId::new(row.get("artifact_id")),
        owner_email: row.get("owner_email"),
        likes: row.get("likes"),
        liked_by: row.get("liked_by"),
        fields,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
