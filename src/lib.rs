//! # Paywarden
//!
//! **Entitlement gating and signed download delivery for subscription platforms.**
//!
//! Paywarden answers one question per download request — "is this user
//! currently entitled to this resource?" — and, when the answer is yes, mints
//! a short-lived, tamper-evident download token authorizing exactly one
//! user/resource/file triple.
//!
//! ## Features
//!
//! - **Four-source entitlement evaluation** — admin override, free content,
//!   active subscription, individual time-limited grant, merged with defined
//!   precedence by a pure function
//! - **HMAC-SHA256 download tokens** — URL-safe bearer capabilities with
//!   constant-time signature verification and uniform rejection
//! - **Fixed-window rate limiting** — per-key counters gating both issuance
//!   and redemption, behind an injectable trait
//! - **Subscription expiry sweep** — idempotent background pass that demotes
//!   lapsed subscribers so the hot-path entitlement check stays a flag read
//! - **Fail-safe entitlement facts** — expiry is re-checked live at every
//!   evaluation, so a missed sweep cycle degrades to correct denials
//!
//! ## Quickstart
//!
//! ```no_run
//! use paywarden::{
//!     DownloadGate, FileId, FixedWindowLimiter, GateConfig, MemoryStore, ResourceId, UserId,
//! };
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), paywarden::PaywardenError> {
//!     let config = GateConfig::from_env()?;
//!     let store = Arc::new(MemoryStore::new());
//!     let limiter = Arc::new(FixedWindowLimiter::new());
//!
//!     let gate = DownloadGate::new(config, limiter, store)?;
//!
//!     let issued = gate.issue(Some(UserId(7)), ResourceId(3), FileId(21))?;
//!     println!("download at {} until {}", issued.download_url, issued.expires_at);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Security posture
//!
//! Tokens are bearer capabilities: anyone holding the string can redeem it
//! until expiry, so the TTL defaults to minutes. Replay within the TTL is
//! accepted by design; the redemption flow re-fetches entitlement facts
//! fresh, closing the gap where a subscription lapses between issuance and
//! redemption. Verification failures are uniform ("invalid or expired") so
//! the error channel cannot be used as a forgery oracle, and 404 covers both
//! missing and cross-resource files so IDs cannot be enumerated.
//!
//! ## Configuration
//!
//! - `PAYWARDEN_SIGNING_SECRET` — HMAC signing secret, required (≥ 32 bytes);
//!   the process must fail fast without it
//! - `PAYWARDEN_TOKEN_TTL_SECS` — token lifetime, default 600
//!
//! See [`GateConfig`] for full documentation.

#![deny(warnings)]
#![deny(missing_docs)]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Domain records
pub mod domain;

// Policy layer
pub mod policy;

// Rate limiting
pub mod limit;

// Token layer
pub mod token;

// Storage boundary
pub mod store;

// Background maintenance
pub mod sweep;

// Gate (main public API)
pub mod manager;

// Re-exports for public API
pub use clock::{Clock, SystemClock};
pub use config::GateConfig;
pub use domain::models::{
    extend_expiry, FileId, FileRecord, IndividualGrant, Resource, ResourceId, Role, Subscription,
    SubscriptionId, User, UserId,
};
pub use errors::PaywardenError;
pub use limit::{FixedWindowLimiter, RateDecision, RateLimiter, RateQuota};
pub use manager::{DownloadGate, IssuedDownload, RedeemedDownload, REDEMPTION_CACHE_CONTROL};
pub use policy::access::{has_access, EntitlementFacts};
pub use store::{EntitlementStore, GrantOutcome, LapseOutcome, MemoryStore};
pub use sweep::{run_expiry_sweep, StopSignal, SweepReport};
pub use token::{IssuedToken, TokenCodec, TokenPayload};

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
