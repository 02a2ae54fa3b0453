//! Core domain records: users, resources, files, subscriptions, grants.
//!
//! These mirror the persistent store's shape as far as this subsystem needs
//! them. Resources are read-only here; subscriptions are mutated only by the
//! expiry sweep (and by external enrollment flows), grants only by the
//! grant-access operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Resource identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub u64);

/// File identifier. Files are looked up globally by this id, then validated
/// against the requested resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub u64);

/// Subscription identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub u64);

/// Coarse user role.
///
/// A fast-path hint only. Admin rights must be checked through the user's
/// `is_admin` flag wherever they grant bypass; the role is never the sole
/// authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform administrator.
    Admin,
    /// User with a subscriber-tier role (kept in sync by the expiry sweep).
    Subscriber,
    /// Plain user.
    Plain,
}

/// A platform user as this subsystem sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable user id.
    pub id: UserId,
    /// Coarse role hint.
    pub role: Role,
    /// Independent admin flag; authoritative for admin bypass.
    pub is_admin: bool,
}

/// A content item gated by entitlement checks. Read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Stable resource id.
    pub id: ResourceId,
    /// Free resources are accessible to everyone.
    pub is_free: bool,
}

/// A downloadable artifact belonging to exactly one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Stable file id.
    pub id: FileId,
    /// Owning resource. Must match the requested resource before a global
    /// file lookup is trusted.
    pub resource_id: ResourceId,
    /// Display name, returned to the client at issuance.
    pub name: String,
    /// Storage location the redemption flow redirects to.
    pub location: String,
}

/// One-per-user subscription record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Stable subscription id.
    pub id: SubscriptionId,
    /// Owning user.
    pub user_id: UserId,
    /// Authoritative cheap-to-read active flag, kept honest by the expiry
    /// sweep.
    pub is_active: bool,
    /// Expiry timestamp; `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// Audit annotation written by the sweep when the subscription lapses.
    pub lapsed_at: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Whether this subscription confers access at `now`.
    ///
    /// Both conditions are checked live so a missed sweep cycle degrades
    /// safely: `is_active` alone is not trusted.
    pub fn confers_access(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.map_or(true, |e| e > now)
    }

    /// Whether the sweep's selection predicate matches at `now`:
    /// still flagged active but past expiry.
    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_some_and(|e| e <= now)
    }
}

/// Per-user, per-resource time-limited grant. At most one per (user, resource)
/// pair; re-grants extend the existing record, never duplicate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndividualGrant {
    /// Grantee.
    pub user_id: UserId,
    /// Granted resource.
    pub resource_id: ResourceId,
    /// Expiry timestamp; `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
}

impl IndividualGrant {
    /// Whether the grant confers access at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |e| e > now)
    }
}

/// Monotonic grant-expiry extension rule.
///
/// The stored expiry becomes `max(existing, new)` where `None` (never expires)
/// is greater than any finite timestamp. Access is never silently shortened by
/// an out-of-order or retried grant.
pub fn extend_expiry(
    existing: Option<DateTime<Utc>>,
    new: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    match (existing, new) {
        (None, _) | (_, None) => None,
        (Some(a), Some(b)) => Some(a.max(b)),
    }
}
