//! The entitlement fact-provider contract.
//!
//! A thin data-access boundary over the persistent store. The gate and the
//! sweep depend only on this trait; swapping the backing store (in-memory,
//! SQL, remote service) changes no call sites. Lookups are the only
//! I/O-bound, fallible steps in issuance and redemption; implementations own
//! their timeout and retry policy and surface failures as
//! [`PaywardenError::Transient`].

use crate::domain::models::{FileId, FileRecord, ResourceId, SubscriptionId, UserId};
use crate::policy::access::EntitlementFacts;
use crate::PaywardenError;
use chrono::{DateTime, Utc};

/// Result of the grant-access upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    /// No grant existed; one was created.
    Created,
    /// A grant existed; its expiry was extended.
    Extended,
    /// A grant existed and already covered the requested expiry; nothing
    /// changed. An embedding layer preferring reject-on-duplicate semantics
    /// can map this to a conflict.
    Unchanged,
}

/// Result of lapsing one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LapseOutcome {
    /// Whether this call deactivated the subscription (false when another
    /// pass already processed it).
    pub deactivated: bool,
    /// Whether the owner was demoted from subscriber-tier to plain-tier
    /// (only when no other active subscription remains).
    pub owner_demoted: bool,
}

/// Data-access boundary supplying entitlement facts and mutating
/// subscription/grant state.
pub trait EntitlementStore: Send + Sync {
    /// Look up a file by its global id.
    fn find_file(&self, file_id: FileId) -> Result<Option<FileRecord>, PaywardenError>;

    /// Assemble the entitlement facts for one (user, resource) pair.
    ///
    /// Implementations must resolve expiry against `now` live, for both
    /// subscriptions and grants, rather than trusting stored flags alone:
    /// a missed sweep cycle must degrade to correct denials, never stale
    /// access.
    fn entitlement_facts(
        &self,
        user_id: UserId,
        resource_id: ResourceId,
        now: DateTime<Utc>,
    ) -> Result<EntitlementFacts, PaywardenError>;

    /// Grant a user time-limited (or permanent, `None`) access to a resource.
    ///
    /// Upsert with monotonic extension: when a grant already exists the
    /// stored expiry becomes `max(existing, new)`, `None` winning over any
    /// finite timestamp. Repeated or out-of-order grants can only widen
    /// access.
    fn grant_access(
        &self,
        user_id: UserId,
        resource_id: ResourceId,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<GrantOutcome, PaywardenError>;

    /// Ids of subscriptions still flagged active whose expiry has passed.
    fn lapsed_subscriptions(&self, now: DateTime<Utc>)
        -> Result<Vec<SubscriptionId>, PaywardenError>;

    /// Lapse one subscription as a single atomic unit of work: deactivate it,
    /// record the lapse time, and demote the owner's coarse role to plain if
    /// no other active subscription remains.
    ///
    /// Idempotent: an already-inactive subscription is a no-op reporting
    /// `deactivated: false`.
    fn lapse_subscription(
        &self,
        id: SubscriptionId,
        now: DateTime<Utc>,
    ) -> Result<LapseOutcome, PaywardenError>;
}
