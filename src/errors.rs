//! Paywarden error types.
//!
//! One variant per outcome in the access-control taxonomy, with the HTTP
//! status an embedding layer should map it to noted on each variant.
//! Entitlement and token failures are definitive for their input; callers
//! must not retry them.

use thiserror::Error;

/// Errors that can occur while gating and delivering downloads.
#[derive(Debug, Error)]
pub enum PaywardenError {
    /// Configuration is invalid or incomplete (fatal at startup, never per-request).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// No caller identity was established (maps to 401).
    #[error("Not authenticated")]
    Unauthenticated,

    /// The download token is invalid or expired (maps to 401).
    ///
    /// Deliberately generic: bad signature, expired, and malformed tokens are
    /// indistinguishable so the error cannot be used as a forgery oracle.
    #[error("Download token invalid or expired")]
    Unauthorized,

    /// The caller is not entitled to the resource (maps to 403).
    #[error("Access denied")]
    Forbidden,

    /// The file or resource does not exist, or the file does not belong to the
    /// requested resource (maps to 404; the two cases are intentionally not
    /// distinguished).
    #[error("File not found")]
    NotFound,

    /// The request rate limit was exceeded (maps to 429 with a `Retry-After`
    /// header).
    #[error("Rate limit exceeded, retry after {retry_after_seconds}s")]
    RateLimited {
        /// Whole seconds until the current window ends.
        retry_after_seconds: u64,
    },

    /// The request itself is malformed (maps to 400).
    #[error("Invalid request: {0}")]
    Invalid(String),

    /// The underlying store is unavailable (maps to 5xx without internal
    /// detail; retry policy belongs to the store, not this crate).
    #[error("Store unavailable: {0}")]
    Transient(String),
}
