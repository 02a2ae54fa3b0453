//! Gate configuration.
//!
//! The HMAC signing secret is process-wide configuration loaded once at
//! startup. A missing or weak secret is a fatal construction-time error,
//! never a per-request one.

use crate::limit::RateQuota;
use crate::token::codec::MIN_SECRET_LEN;
use crate::PaywardenError;
use std::time::Duration;

/// Environment variable holding the token signing secret (required).
pub const SIGNING_SECRET_VAR: &str = "PAYWARDEN_SIGNING_SECRET";

/// Environment variable overriding the token TTL in seconds (optional).
pub const TOKEN_TTL_VAR: &str = "PAYWARDEN_TOKEN_TTL_SECS";

/// Default download token lifetime. Tokens are bearer capabilities, so the
/// TTL stays on the order of minutes.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(10 * 60);

/// Default issuance quota: per caller+resource+file.
pub const DEFAULT_ISSUE_QUOTA: RateQuota = RateQuota {
    window: Duration::from_secs(60),
    limit: 20,
};

/// Default redemption quota: per token-user+file.
pub const DEFAULT_REDEEM_QUOTA: RateQuota = RateQuota {
    window: Duration::from_secs(60),
    limit: 60,
};

/// Configuration for the download gate.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// HMAC-SHA256 signing secret for download tokens.
    pub signing_secret: String,

    /// Lifetime of issued download tokens.
    pub token_ttl: Duration,

    /// Rate quota applied to token issuance.
    pub issue_quota: RateQuota,

    /// Rate quota applied to token redemption.
    pub redeem_quota: RateQuota,

    /// Path the redemption URL is built from, e.g. `/downloads/redeem`.
    /// The token is appended as a `token` query parameter.
    pub redemption_path: String,
}

impl GateConfig {
    /// Build a configuration with defaults around the given secret.
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            token_ttl: DEFAULT_TOKEN_TTL,
            issue_quota: DEFAULT_ISSUE_QUOTA,
            redeem_quota: DEFAULT_REDEEM_QUOTA,
            redemption_path: "/downloads/redeem".to_string(),
        }
    }

    /// Load configuration from the environment.
    ///
    /// `PAYWARDEN_SIGNING_SECRET` is required; its absence fails startup.
    /// `PAYWARDEN_TOKEN_TTL_SECS` optionally overrides the default TTL.
    pub fn from_env() -> Result<Self, PaywardenError> {
        let secret = std::env::var(SIGNING_SECRET_VAR).map_err(|_| {
            PaywardenError::ConfigError(format!("{} must be set", SIGNING_SECRET_VAR))
        })?;

        let mut config = Self::new(secret);

        if let Ok(raw) = std::env::var(TOKEN_TTL_VAR) {
            let secs: u64 = raw.parse().map_err(|_| {
                PaywardenError::ConfigError(format!(
                    "{} must be a positive integer, got {:?}",
                    TOKEN_TTL_VAR, raw
                ))
            })?;
            config.token_ttl = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), PaywardenError> {
        if self.signing_secret.len() < MIN_SECRET_LEN {
            return Err(PaywardenError::ConfigError(format!(
                "signing secret must be at least {} bytes, got {}",
                MIN_SECRET_LEN,
                self.signing_secret.len()
            )));
        }
        if self.token_ttl.is_zero() {
            return Err(PaywardenError::ConfigError(
                "token_ttl must be greater than zero".to_string(),
            ));
        }
        if self.issue_quota.limit == 0 || self.redeem_quota.limit == 0 {
            return Err(PaywardenError::ConfigError(
                "rate quota limits must be greater than zero".to_string(),
            ));
        }
        if self.redemption_path.is_empty() {
            return Err(PaywardenError::ConfigError(
                "redemption_path cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
