//! Download token payload.

use crate::domain::models::{FileId, ResourceId, UserId};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// The claims carried by a download token.
///
/// Serialized with deterministic field order, base64url-encoded, and signed.
/// The token is a bearer capability: possession alone authorizes redemption
/// until `expires_at`, independent of who presents it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// User the token was issued to.
    pub user_id: UserId,
    /// Resource the file must belong to at redemption time.
    pub resource_id: ResourceId,
    /// File the token authorizes.
    pub file_id: FileId,
    /// Expiry as milliseconds since the Unix epoch.
    pub expires_at: i64,
    /// Random uniqueness salt (base64url). Prevents two tokens minted in the
    /// same millisecond for the same triple from being byte-identical; carries
    /// no security weight by itself.
    pub nonce: String,
}

impl TokenPayload {
    /// Whether the token has expired at `now_millis`.
    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.expires_at <= now_millis
    }

    /// Expiry as a UTC timestamp, if representable.
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.expires_at).single()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(expires_at: i64) -> TokenPayload {
        TokenPayload {
            user_id: UserId(7),
            resource_id: ResourceId(3),
            file_id: FileId(21),
            expires_at,
            nonce: "c2FsdA".to_string(),
        }
    }

    #[test]
    fn test_expiry_is_inclusive_at_boundary() {
        let p = payload(1_000);
        assert!(!p.is_expired(999));
        assert!(p.is_expired(1_000));
        assert!(p.is_expired(1_001));
    }

    #[test]
    fn test_serde_roundtrip_preserves_ids() {
        let p = payload(1_717_243_200_000);
        let json = serde_json::to_string(&p).unwrap();
        let back: TokenPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_field_order_is_deterministic() {
        let p = payload(42);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(
            json,
            r#"{"user_id":7,"resource_id":3,"file_id":21,"expires_at":42,"nonce":"c2FsdA"}"#
        );
    }

    #[test]
    fn test_non_numeric_expiry_rejected() {
        let json = r#"{"user_id":7,"resource_id":3,"file_id":21,"expires_at":"soon","nonce":"x"}"#;
        assert!(serde_json::from_str::<TokenPayload>(json).is_err());
    }

    #[test]
    fn test_missing_expiry_rejected() {
        let json = r#"{"user_id":7,"resource_id":3,"file_id":21,"nonce":"x"}"#;
        assert!(serde_json::from_str::<TokenPayload>(json).is_err());
    }

    #[test]
    fn test_expires_at_utc_conversion() {
        let p = payload(0);
        assert_eq!(p.expires_at_utc().unwrap().to_rfc3339(), "1970-01-01T00:00:00+00:00");
    }
}
