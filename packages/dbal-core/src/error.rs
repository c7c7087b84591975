//! DBAL Error Taxonomy
//!
//! One typed error value covers every failure surfaced by the schema loader,
//! the SQL adapter, and the blob backends. Each variant carries the HTTP
//! status it maps to (see [`DbalError::status_code`]) so a boundary
//! collaborator can serialize it without re-deriving the mapping.
//!
//! Internal layers never panic on an expected failure; they return
//! `Result<T, DbalError>`. Only a programmer-contract violation (reading a
//! committed flag after a transaction guard already consumed it) is allowed
//! to panic, and none of the public API in this crate does so.

use serde_json::{json, Value};
use std::fmt;

pub mod translators;

/// Convenience alias used throughout the crate's public API.
pub type Result<T> = std::result::Result<T, DbalError>;

/// The full error taxonomy, HTTP-aligned per the error handling design.
#[derive(thiserror::Error, Debug)]
pub enum DbalError {
    /// Missing record, blob, or entity schema.
    #[error("not found: {0}")]
    NotFound(String),

    /// Unique/primary-key violation, or an overwrite refused by policy.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Missing credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not permitted.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Bad input, bad key, bad range, or a schema that failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// A tenant quota ceiling was reached.
    #[error("rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    InternalError(String),

    /// Operation exceeded its time budget.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The database engine is unavailable or locked.
    #[error("database error: {0}")]
    DatabaseError(String),

    /// Requested capability is not implemented by this backend.
    #[error("capability not supported: {0}")]
    CapabilityNotSupported(String),

    /// A plugin attempted a disallowed capability.
    ///
    /// No operation in this crate raises this variant; it is carried in the
    /// shared taxonomy for collaborators that embed a plugin sandbox.
    #[error("sandbox violation: {0}")]
    SandboxViolation(String),

    /// A plugin carried a banned payload.
    ///
    /// Like [`DbalError::SandboxViolation`], this is inert here and exists
    /// only so the taxonomy matches the one shared across collaborators.
    #[error("malicious code detected: {0}")]
    MaliciousCodeDetected(String),
}

impl DbalError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn rate_limit(msg: impl Into<String>) -> Self {
        Self::RateLimitExceeded(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::DatabaseError(msg.into())
    }

    pub fn capability_not_supported(msg: impl Into<String>) -> Self {
        Self::CapabilityNotSupported(msg.into())
    }

    /// The HTTP status this error kind is aligned with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::ValidationError(_) => 422,
            Self::RateLimitExceeded(_) => 429,
            Self::InternalError(_) => 500,
            Self::Timeout(_) => 504,
            Self::DatabaseError(_) => 503,
            Self::CapabilityNotSupported(_) => 501,
            Self::SandboxViolation(_) => 406,
            Self::MaliciousCodeDetected(_) => 451,
        }
    }

    /// The fixed type name used in the error envelope.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFound",
            Self::Conflict(_) => "Conflict",
            Self::Unauthorized(_) => "Unauthorized",
            Self::Forbidden(_) => "Forbidden",
            Self::ValidationError(_) => "ValidationError",
            Self::RateLimitExceeded(_) => "RateLimitExceeded",
            Self::InternalError(_) => "InternalError",
            Self::Timeout(_) => "Timeout",
            Self::DatabaseError(_) => "DatabaseError",
            Self::CapabilityNotSupported(_) => "CapabilityNotSupported",
            Self::SandboxViolation(_) => "SandboxViolation",
            Self::MaliciousCodeDetected(_) => "MaliciousCodeDetected",
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::NotFound(m)
            | Self::Conflict(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::ValidationError(m)
            | Self::RateLimitExceeded(m)
            | Self::InternalError(m)
            | Self::Timeout(m)
            | Self::DatabaseError(m)
            | Self::CapabilityNotSupported(m)
            | Self::SandboxViolation(m)
            | Self::MaliciousCodeDetected(m) => m,
        }
    }

    /// Whether a caller may usefully retry this failure.
    ///
    /// Only `DatabaseError` arising from a busy/locked engine is retryable
    /// in this design; blob operations and transactions are never retried
    /// inside the core.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DatabaseError(_) | Self::Timeout(_))
    }

    /// Serialize to the standard error envelope.
    ///
    /// `include_details` controls whether the human-readable message is
    /// present; when `false` only `code` and `type` are emitted.
    pub fn to_error_json(&self, include_details: bool) -> Value {
        let mut error = json!({
            "code": self.status_code(),
            "type": self.kind_name(),
        });
        if include_details {
            error["message"] = json!(self.message());
        }
        json!({ "error": error })
    }

    /// Log this error at the severity its kind warrants.
    pub fn log(&self) {
        match self {
            Self::InternalError(_) | Self::DatabaseError(_) | Self::MaliciousCodeDetected(_) => {
                tracing::error!(kind = self.kind_name(), "{}", self)
            }
            Self::Timeout(_) | Self::SandboxViolation(_) => {
                tracing::error!(kind = self.kind_name(), severity = "elevated", "{}", self)
            }
            _ => tracing::warn!(kind = self.kind_name(), "{}", self),
        }
    }
}

/// Backwards-compatible alias for call sites that log without constructing
/// a bound method reference.
pub fn log_error(err: &DbalError) {
    err.log();
}

impl fmt::Display for DbalErrorEnvelope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_error_json(self.1))
    }
}

/// A display wrapper pairing an error with the `include_details` switch,
/// useful at call sites that only have a `Display` bound available.
pub struct DbalErrorEnvelope<'a>(pub &'a DbalError, pub bool);
