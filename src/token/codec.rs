//! HMAC-SHA256 download token signer/verifier.
//!
//! Token format: `<payload_b64url>.<signature_b64url>`, both segments
//! URL-safe unpadded base64. The signature covers the encoded payload
//! segment byte-for-byte, so verification never touches the payload before
//! the signature matches.
//!
//! Verification is fail-closed and uniform: wrong segment count, bad base64,
//! signature mismatch, JSON failure, and expiry all come back as `None`.
//! Signature comparison is constant-time.

use crate::clock::Clock;
use crate::domain::models::{FileId, ResourceId, UserId};
use crate::token::payload::TokenPayload;
use crate::PaywardenError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::time::Duration;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Segment separator between payload and signature.
const SEPARATOR: char = '.';

/// Nonce entropy in bytes; 12 keeps the base64url form padding-free.
const NONCE_LEN: usize = 12;

/// Minimum accepted signing secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// A freshly minted token plus its expiry for client display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// The signed, URL-safe token string.
    pub token: String,
    /// When the token stops verifying.
    pub expires_at: DateTime<Utc>,
}

/// Stateless signer/verifier for download tokens.
///
/// Holds the process-wide HMAC key, loaded once at construction. Create and
/// verify are pure CPU work with no suspension points.
pub struct TokenCodec {
    key: HmacSha256,
}

impl TokenCodec {
    /// Create a codec from the signing secret.
    ///
    /// # Errors
    /// `ConfigError` if the secret is shorter than [`MIN_SECRET_LEN`] bytes.
    pub fn new(secret: &[u8]) -> Result<Self, PaywardenError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(PaywardenError::ConfigError(format!(
                "signing secret must be at least {} bytes, got {}",
                MIN_SECRET_LEN,
                secret.len()
            )));
        }

        let key = HmacSha256::new_from_slice(secret).map_err(|e| {
            PaywardenError::ConfigError(format!("invalid signing secret: {}", e))
        })?;

        Ok(Self { key })
    }

    /// Mint a signed token authorizing one (user, resource, file) triple.
    ///
    /// # Errors
    /// `ConfigError` if `ttl` does not fit a chrono duration (practically
    /// unreachable with sane configuration).
    pub fn create(
        &self,
        user_id: UserId,
        resource_id: ResourceId,
        file_id: FileId,
        ttl: Duration,
        clock: &dyn Clock,
    ) -> Result<IssuedToken, PaywardenError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| PaywardenError::ConfigError(format!("token ttl out of range: {}", e)))?;
        let expires_at = clock.now_utc() + ttl;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let payload = TokenPayload {
            user_id,
            resource_id,
            file_id,
            expires_at: expires_at.timestamp_millis(),
            nonce: URL_SAFE_NO_PAD.encode(nonce_bytes),
        };

        let json = serde_json::to_vec(&payload)
            .map_err(|e| PaywardenError::Invalid(format!("payload serialization: {}", e)))?;
        let segment = URL_SAFE_NO_PAD.encode(json);

        let signature = self.sign(segment.as_bytes());
        let token = format!("{}{}{}", segment, SEPARATOR, URL_SAFE_NO_PAD.encode(signature));

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify a token and return its payload, or `None` if it is invalid in
    /// any way: malformed, tampered, or expired. Never panics.
    pub fn verify(&self, token: &str, clock: &dyn Clock) -> Option<TokenPayload> {
        let mut segments = token.split(SEPARATOR);
        let payload_segment = segments.next()?;
        let signature_segment = segments.next()?;
        if segments.next().is_some() || payload_segment.is_empty() || signature_segment.is_empty() {
            return None;
        }

        let provided = URL_SAFE_NO_PAD.decode(signature_segment).ok()?;
        let expected = self.sign(payload_segment.as_bytes());
        if !bool::from(expected.ct_eq(provided.as_slice())) {
            return None;
        }

        // Signature matched; only now decode the payload.
        let json = URL_SAFE_NO_PAD.decode(payload_segment).ok()?;
        let payload: TokenPayload = serde_json::from_slice(&json).ok()?;

        if payload.is_expired(clock.epoch_millis()) {
            return None;
        }

        Some(payload)
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        let mut mac = self.key.clone();
        mac.update(message);
        mac.finalize().into_bytes().to_vec()
    }
}
