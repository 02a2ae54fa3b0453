//! Download gate - the main public API for Paywarden.
//!
//! The `DownloadGate` orchestrates the two request flows:
//! - Issuance: rate limit, file-ownership check, entitlement evaluation,
//!   token minting, redemption URL.
//! - Redemption: token verification, rate limit, fresh re-resolution of the
//!   file and the entitlement facts, storage location with caching disabled.
//!
//! Both flows are request-scoped and safely concurrent; the gate holds no
//! mutable state of its own beyond the injected limiter's counters.

use crate::clock::{Clock, SystemClock};
use crate::config::GateConfig;
use crate::domain::models::{FileId, FileRecord, ResourceId, UserId};
use crate::limit::RateLimiter;
use crate::policy::access::has_access;
use crate::store::EntitlementStore;
use crate::token::TokenCodec;
use crate::PaywardenError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

/// Cache directive for redemption responses, so intermediaries never cache a
/// capability-bound redirect.
pub const REDEMPTION_CACHE_CONTROL: &str = "private, no-store";

/// A successfully issued download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedDownload {
    /// The authorized file's id.
    pub file_id: FileId,
    /// The file's display name.
    pub file_name: String,
    /// Redemption URL with the token embedded as a query parameter.
    pub download_url: String,
    /// Token expiry, for client display.
    pub expires_at: DateTime<Utc>,
}

/// A successfully redeemed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemedDownload {
    /// The authorized file's id.
    pub file_id: FileId,
    /// Storage location to redirect to.
    pub location: String,
    /// Value for the `Cache-Control` header on the redirect.
    pub cache_control: &'static str,
}

/// Main download gate for Paywarden.
///
/// Create one instance per process and share it across requests.
pub struct DownloadGate {
    config: GateConfig,
    clock: Arc<dyn Clock>,
    limiter: Arc<dyn RateLimiter>,
    store: Arc<dyn EntitlementStore>,
    codec: TokenCodec,
}

impl DownloadGate {
    /// Create a new gate with the given configuration and collaborators.
    ///
    /// Uses the system clock.
    ///
    /// # Errors
    /// Returns `ConfigError` if configuration validation fails or the signing
    /// secret is unusable.
    pub fn new(
        config: GateConfig,
        limiter: Arc<dyn RateLimiter>,
        store: Arc<dyn EntitlementStore>,
    ) -> Result<Self, PaywardenError> {
        Self::with_clock(config, limiter, store, Arc::new(SystemClock))
    }

    /// Create a gate with a custom clock (for testing).
    #[cfg(any(test, feature = "test-seams"))]
    pub fn new_with_clock(
        config: GateConfig,
        limiter: Arc<dyn RateLimiter>,
        store: Arc<dyn EntitlementStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PaywardenError> {
        Self::with_clock(config, limiter, store, clock)
    }

    fn with_clock(
        config: GateConfig,
        limiter: Arc<dyn RateLimiter>,
        store: Arc<dyn EntitlementStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PaywardenError> {
        config.validate()?;
        let codec = TokenCodec::new(config.signing_secret.as_bytes())?;

        Ok(Self {
            config,
            clock,
            limiter,
            store,
            codec,
        })
    }

    /// Issue a download token for `file_id` under `resource_id`.
    ///
    /// `session_user` is the authenticated caller; `None` means no session
    /// was established.
    ///
    /// # Errors
    /// - `Unauthenticated` - no session
    /// - `RateLimited` - issuance quota exceeded
    /// - `NotFound` - file absent, or it belongs to a different resource
    /// - `Forbidden` - entitlement evaluation denied access
    pub fn issue(
        &self,
        session_user: Option<UserId>,
        resource_id: ResourceId,
        file_id: FileId,
    ) -> Result<IssuedDownload, PaywardenError> {
        let user_id = session_user.ok_or(PaywardenError::Unauthenticated)?;

        // 1. Rate-limit issuance per (caller, resource, file)
        let key = format!("issue:{}:{}:{}", user_id.0, resource_id.0, file_id.0);
        let decision = self
            .limiter
            .check(&key, self.config.issue_quota, self.clock.as_ref());
        if !decision.allowed {
            return Err(PaywardenError::RateLimited {
                retry_after_seconds: decision.retry_after_seconds,
            });
        }

        // 2. Resolve the file and validate ownership. Missing and
        //    wrong-resource are the same NotFound so cross-resource file
        //    existence cannot be probed.
        let file = self.resolve_file(file_id, resource_id)?;

        // 3. Gather entitlement facts
        let now = self.clock.now_utc();
        let facts = self.store.entitlement_facts(user_id, resource_id, now)?;

        // 4. Evaluate
        if !has_access(&facts) {
            return Err(PaywardenError::Forbidden);
        }

        // 5. Mint the token
        let issued = self.codec.create(
            user_id,
            resource_id,
            file_id,
            self.config.token_ttl,
            self.clock.as_ref(),
        )?;

        // 6. Build the redemption URL
        let download_url = format!("{}?token={}", self.config.redemption_path, issued.token);

        info!(
            user_id = user_id.0,
            resource_id = resource_id.0,
            file_id = file_id.0,
            expires_at = %issued.expires_at,
            "download token issued"
        );

        Ok(IssuedDownload {
            file_id: file.id,
            file_name: file.name,
            download_url,
            expires_at: issued.expires_at,
        })
    }

    /// Redeem a download token.
    ///
    /// No session is required: the token itself is the credential. Facts are
    /// re-fetched fresh because a subscription can lapse between issuance and
    /// redemption; the token's validity alone is not trusted.
    ///
    /// # Errors
    /// - `Invalid` - empty or blank token parameter
    /// - `Unauthorized` - token malformed, tampered, or expired
    /// - `RateLimited` - redemption quota exceeded
    /// - `NotFound` - file vanished or was reassigned since issuance
    /// - `Forbidden` - entitlement denied on re-check
    pub fn redeem(&self, token: &str) -> Result<RedeemedDownload, PaywardenError> {
        if token.trim().is_empty() {
            return Err(PaywardenError::Invalid("missing token".to_string()));
        }

        // 1. Verify signature and expiry; all failures are one generic error
        let payload = self
            .codec
            .verify(token, self.clock.as_ref())
            .ok_or(PaywardenError::Unauthorized)?;

        // 2. Rate-limit redemption per (token user, file)
        let key = format!("redeem:{}:{}", payload.user_id.0, payload.file_id.0);
        let decision = self
            .limiter
            .check(&key, self.config.redeem_quota, self.clock.as_ref());
        if !decision.allowed {
            return Err(PaywardenError::RateLimited {
                retry_after_seconds: decision.retry_after_seconds,
            });
        }

        // 3. Re-resolve the file against the token's resource
        let file = self.resolve_file(payload.file_id, payload.resource_id)?;

        // 4. Re-fetch facts and re-evaluate
        let now = self.clock.now_utc();
        let facts = self
            .store
            .entitlement_facts(payload.user_id, payload.resource_id, now)?;
        if !has_access(&facts) {
            return Err(PaywardenError::Forbidden);
        }

        info!(
            user_id = payload.user_id.0,
            resource_id = payload.resource_id.0,
            file_id = payload.file_id.0,
            "download token redeemed"
        );

        Ok(RedeemedDownload {
            file_id: file.id,
            location: file.location,
            cache_control: REDEMPTION_CACHE_CONTROL,
        })
    }

    /// Look up a file and require it to belong to the expected resource.
    fn resolve_file(
        &self,
        file_id: FileId,
        resource_id: ResourceId,
    ) -> Result<FileRecord, PaywardenError> {
        let file = self
            .store
            .find_file(file_id)?
            .ok_or(PaywardenError::NotFound)?;

        if file.resource_id != resource_id {
            return Err(PaywardenError::NotFound);
        }

        Ok(file)
    }

    /// Get the current configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::domain::models::{FileRecord, Resource, Role, User};
    use crate::limit::FixedWindowLimiter;
    use crate::store::MemoryStore;

    fn test_config() -> GateConfig {
        GateConfig::new("0123456789abcdef0123456789abcdef")
    }

    fn seeded_store() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store
            .insert_user(User {
                id: UserId(7),
                role: Role::Plain,
                is_admin: false,
            })
            .unwrap();
        store
            .insert_resource(Resource {
                id: ResourceId(3),
                is_free: true,
            })
            .unwrap();
        store
            .insert_file(FileRecord {
                id: FileId(21),
                resource_id: ResourceId(3),
                name: "chapter-one.pdf".to_string(),
                location: "s3://content/chapter-one.pdf".to_string(),
            })
            .unwrap();
        Arc::new(store)
    }

    fn test_gate(store: Arc<MemoryStore>) -> DownloadGate {
        DownloadGate::new_with_clock(
            test_config(),
            Arc::new(FixedWindowLimiter::new()),
            store,
            Arc::new(MockClock::from_rfc3339("2025-06-01T12:00:00Z")),
        )
        .unwrap()
    }

    #[test]
    fn test_gate_rejects_bad_config() {
        let result = DownloadGate::new(
            GateConfig::new("short"),
            Arc::new(FixedWindowLimiter::new()),
            seeded_store(),
        );
        assert!(matches!(result, Err(PaywardenError::ConfigError(_))));
    }

    #[test]
    fn test_issue_requires_session() {
        let gate = test_gate(seeded_store());
        let result = gate.issue(None, ResourceId(3), FileId(21));
        assert!(matches!(result, Err(PaywardenError::Unauthenticated)));
    }

    #[test]
    fn test_issue_unknown_file_not_found() {
        let gate = test_gate(seeded_store());
        let result = gate.issue(Some(UserId(7)), ResourceId(3), FileId(99));
        assert!(matches!(result, Err(PaywardenError::NotFound)));
    }

    #[test]
    fn test_issue_cross_resource_file_not_found() {
        let store = seeded_store();
        store
            .insert_resource(Resource {
                id: ResourceId(4),
                is_free: true,
            })
            .unwrap();
        let gate = test_gate(store);

        // File 21 belongs to resource 3; asking for it under resource 4 must
        // be indistinguishable from a missing file
        let result = gate.issue(Some(UserId(7)), ResourceId(4), FileId(21));
        assert!(matches!(result, Err(PaywardenError::NotFound)));
    }

    #[test]
    fn test_issue_builds_redemption_url() {
        let gate = test_gate(seeded_store());
        let issued = gate.issue(Some(UserId(7)), ResourceId(3), FileId(21)).unwrap();

        assert_eq!(issued.file_name, "chapter-one.pdf");
        assert!(issued.download_url.starts_with("/downloads/redeem?token="));
    }

    #[test]
    fn test_issue_forbidden_without_entitlement() {
        let store = seeded_store();
        store
            .insert_resource(Resource {
                id: ResourceId(3),
                is_free: false,
            })
            .unwrap();
        let gate = test_gate(store);

        let result = gate.issue(Some(UserId(7)), ResourceId(3), FileId(21));
        assert!(matches!(result, Err(PaywardenError::Forbidden)));
    }

    #[test]
    fn test_issue_rate_limited_after_quota() {
        let store = seeded_store();
        let mut config = test_config();
        config.issue_quota.limit = 2;
        let gate = DownloadGate::new_with_clock(
            config,
            Arc::new(FixedWindowLimiter::new()),
            store,
            Arc::new(MockClock::from_rfc3339("2025-06-01T12:00:00Z")),
        )
        .unwrap();

        gate.issue(Some(UserId(7)), ResourceId(3), FileId(21)).unwrap();
        gate.issue(Some(UserId(7)), ResourceId(3), FileId(21)).unwrap();
        let result = gate.issue(Some(UserId(7)), ResourceId(3), FileId(21));
        assert!(matches!(
            result,
            Err(PaywardenError::RateLimited { retry_after_seconds }) if retry_after_seconds > 0
        ));
    }

    #[test]
    fn test_redeem_empty_token_invalid() {
        let gate = test_gate(seeded_store());
        assert!(matches!(gate.redeem(""), Err(PaywardenError::Invalid(_))));
        assert!(matches!(gate.redeem("  "), Err(PaywardenError::Invalid(_))));
    }

    #[test]
    fn test_redeem_garbage_token_unauthorized() {
        let gate = test_gate(seeded_store());
        let result = gate.redeem("not.a-token");
        assert!(matches!(result, Err(PaywardenError::Unauthorized)));
    }

    #[test]
    fn test_issue_then_redeem() {
        let gate = test_gate(seeded_store());
        let issued = gate.issue(Some(UserId(7)), ResourceId(3), FileId(21)).unwrap();

        let token = issued.download_url.split("token=").nth(1).unwrap();
        let redeemed = gate.redeem(token).unwrap();

        assert_eq!(redeemed.file_id, FileId(21));
        assert_eq!(redeemed.location, "s3://content/chapter-one.pdf");
        assert_eq!(redeemed.cache_control, "private, no-store");
    }

    #[test]
    fn test_redeem_after_file_vanishes_not_found() {
        let store = seeded_store();
        let gate = test_gate(Arc::clone(&store));
        let issued = gate.issue(Some(UserId(7)), ResourceId(3), FileId(21)).unwrap();

        // File reassigned to another resource after issuance
        store
            .insert_file(FileRecord {
                id: FileId(21),
                resource_id: ResourceId(4),
                name: "chapter-one.pdf".to_string(),
                location: "s3://content/chapter-one.pdf".to_string(),
            })
            .unwrap();

        let token = issued.download_url.split("token=").nth(1).unwrap();
        let result = gate.redeem(token);
        assert!(matches!(result, Err(PaywardenError::NotFound)));
    }
}
