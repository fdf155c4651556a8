//! Access Guard Module
//!
//! Bearer-token identity verification for owner-scoped routes. A caller
//! presents `Authorization: Bearer <token>`; the verifier validates the
//! token against the service credential and yields a [`Principal`] carrying
//! the verified email claim. [`authorize_owner_scope`] then enforces that a
//! caller may only request artifacts/likes scoped to their own identity.
//!
//! The service credential arrives as a base64-encoded JSON blob in the
//! environment (`GALLERY_IDENTITY_CREDENTIAL`), matching how the deployment
//! provisions identity-provider credentials. Only the two owner-scoped list
//! routes invoke this guard; everything else is deliberately open.

use crate::error::{ApiError, ApiResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// CLOCK ABSTRACTION (FOR DETERMINISTIC TESTS)
// ============================================================================

/// Clock abstraction for token time validation.
///
/// Owning time validation (instead of letting `jsonwebtoken` do it) lets
/// tests inject a fixed clock and keeps expiry checks deterministic.
pub trait TokenClock: Send + Sync {
    /// Get current time as Unix epoch seconds.
    fn now_epoch_secs(&self) -> i64;
}

/// Production clock using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TokenClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl TokenClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

// ============================================================================
// SERVICE CREDENTIAL
// ============================================================================

/// Errors raised while loading or decoding the service credential blob.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("missing required environment variable: {var}")]
    MissingEnv { var: &'static str },

    #[error("credential blob is not valid base64: {reason}")]
    InvalidBase64 { reason: String },

    #[error("credential blob is not valid JSON: {reason}")]
    InvalidJson { reason: String },

    #[error("credential field '{field}' is missing or empty")]
    MissingField { field: &'static str },
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        ApiError::internal_error(format!("Identity credential error: {}", err))
    }
}

/// Raw shape of the decoded credential JSON.
#[derive(Deserialize)]
struct CredentialBlob {
    issuer: String,
    secret: String,
}

/// Identity-provider service credential.
///
/// The signing secret is held in a [`SecretString`] so it cannot be
/// accidentally logged or displayed.
#[derive(Clone)]
pub struct ServiceCredential {
    /// Expected token issuer.
    pub issuer: String,
    secret: SecretString,
}

impl ServiceCredential {
    /// Build a credential from its parts, validating non-emptiness.
    pub fn new(issuer: String, secret: String) -> Result<Self, CredentialError> {
        if issuer.trim().is_empty() {
            return Err(CredentialError::MissingField { field: "issuer" });
        }
        if secret.is_empty() {
            return Err(CredentialError::MissingField { field: "secret" });
        }
        Ok(Self {
            issuer,
            secret: SecretString::new(secret.into()),
        })
    }

    /// Decode a credential from a base64-encoded JSON blob.
    pub fn from_base64(blob: &str) -> Result<Self, CredentialError> {
        let bytes = BASE64
            .decode(blob.trim())
            .map_err(|e| CredentialError::InvalidBase64 {
                reason: e.to_string(),
            })?;

        let parsed: CredentialBlob =
            serde_json::from_slice(&bytes).map_err(|e| CredentialError::InvalidJson {
                reason: e.to_string(),
            })?;

        Self::new(parsed.issuer, parsed.secret)
    }

    /// Load the credential from `GALLERY_IDENTITY_CREDENTIAL`.
    pub fn from_env() -> Result<Self, CredentialError> {
        let blob = std::env::var("GALLERY_IDENTITY_CREDENTIAL").map_err(|_| {
            CredentialError::MissingEnv {
                var: "GALLERY_IDENTITY_CREDENTIAL",
            }
        })?;
        Self::from_base64(&blob)
    }

    /// Expose the signing secret (only for cryptographic operations).
    fn expose_secret(&self) -> &str {
        self.secret.expose_secret()
    }
}

impl std::fmt::Debug for ServiceCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCredential")
            .field("issuer", &self.issuer)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// TOKEN CLAIMS
// ============================================================================

/// Claims carried by an identity token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (stable user identifier at the identity provider)
    #[serde(default)]
    pub sub: Option<String>,

    /// Verified email address of the caller
    pub email: String,

    /// Token issuer
    #[serde(default)]
    pub iss: Option<String>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Create new claims for a caller using a clock.
    pub fn new(email: String, issuer: &str, expiration_secs: i64, clock: &dyn TokenClock) -> Self {
        let now = clock.now_epoch_secs();

        Self {
            sub: None,
            email,
            iss: Some(issuer.to_string()),
            iat: now,
            exp: now + expiration_secs,
        }
    }
}

/// The identity resolved from a verified bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Verified email claim.
    pub email: String,

    /// Subject identifier at the identity provider, when present.
    pub subject: Option<String>,
}

// ============================================================================
// IDENTITY VERIFIER
// ============================================================================

/// Verifies bearer credentials against the identity provider's credential.
pub struct IdentityVerifier {
    credential: ServiceCredential,
    algorithm: Algorithm,
    /// Clock skew tolerance in seconds for exp validation.
    clock_skew_secs: i64,
    clock: Arc<dyn TokenClock>,
}

impl IdentityVerifier {
    /// Create a verifier from a credential with default settings.
    pub fn new(credential: ServiceCredential) -> Self {
        Self {
            credential,
            algorithm: Algorithm::HS256,
            clock_skew_secs: 60,
            clock: Arc::new(SystemClock),
        }
    }

    /// Create a verifier from the environment.
    ///
    /// Environment variables:
    /// - `GALLERY_IDENTITY_CREDENTIAL`: base64-encoded JSON credential blob
    /// - `GALLERY_TOKEN_CLOCK_SKEW_SECS`: skew tolerance (default: 60)
    pub fn from_env() -> Result<Self, CredentialError> {
        let credential = ServiceCredential::from_env()?;
        let clock_skew_secs = std::env::var("GALLERY_TOKEN_CLOCK_SKEW_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        Ok(Self {
            clock_skew_secs,
            ..Self::new(credential)
        })
    }

    /// Replace the clock (used by tests for determinism).
    pub fn with_clock(mut self, clock: Arc<dyn TokenClock>) -> Self {
        self.clock = clock;
        self
    }

    /// Verify an `Authorization` header value and resolve the principal.
    ///
    /// Fails with `Unauthorized` when the header is missing, `InvalidToken`
    /// when the scheme is not Bearer or the signature does not verify, and
    /// `TokenExpired` when the token is past its expiry.
    pub fn verify_bearer(&self, auth_header: Option<&str>) -> ApiResult<Principal> {
        let header = auth_header
            .ok_or_else(|| ApiError::unauthorized("Authorization header required"))?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::invalid_token("Authorization header must use Bearer scheme")
        })?;

        let claims = self.validate_token(token)?;

        Ok(Principal {
            email: claims.email,
            subject: claims.sub,
        })
    }

    /// Validate a raw token and extract its claims.
    ///
    /// Signature validation is delegated to `jsonwebtoken`; time validation
    /// is done here against the injected clock with skew tolerance.
    pub fn validate_token(&self, token: &str) -> ApiResult<Claims> {
        let decoding_key = DecodingKey::from_secret(self.credential.expose_secret().as_bytes());

        // Decode with signature validation only; exp is checked below with
        // our own clock.
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims = std::collections::HashSet::from(["exp".to_string()]);

        let token_data =
            decode::<Claims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    ApiError::invalid_token("Token is invalid")
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    ApiError::invalid_token("Token signature is invalid")
                }
                _ => ApiError::invalid_token(format!("Token validation failed: {}", e)),
            })?;

        let claims = token_data.claims;

        if let Some(iss) = &claims.iss {
            if iss != &self.credential.issuer {
                return Err(ApiError::invalid_token("Token issuer mismatch"));
            }
        }

        if claims.email.trim().is_empty() {
            return Err(ApiError::invalid_token("Token has no email claim"));
        }

        let now = self.clock.now_epoch_secs();
        if claims.exp < now - self.clock_skew_secs {
            return Err(ApiError::token_expired());
        }

        Ok(claims)
    }

    /// Generate an identity token signed with the service credential.
    ///
    /// Used by tests and local tooling; in deployment tokens are minted by
    /// the identity provider.
    pub fn generate_token(&self, email: String, expiration_secs: i64) -> ApiResult<String> {
        let claims = Claims::new(email, &self.credential.issuer, expiration_secs, &*self.clock);

        let encoding_key = EncodingKey::from_secret(self.credential.expose_secret().as_bytes());
        let header = Header::new(self.algorithm);

        encode(&header, &claims, &encoding_key)
            .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))
    }
}

// ============================================================================
// OWNER-SCOPE AUTHORIZATION
// ============================================================================

/// Enforce that the requested owner scope matches the verified principal.
///
/// Owner-scoped routes may only return records owned by (or likes attributed
/// to) the caller's own verified identity.
pub fn authorize_owner_scope(requested_email: &str, principal: &Principal) -> ApiResult<()> {
    if requested_email == principal.email {
        Ok(())
    } else {
        Err(ApiError::forbidden("Access denied: email does not match verified identity"))
    }
}

// ============================================================================
// TESTS
// ============================================================================
