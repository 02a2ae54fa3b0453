//! Entitlement evaluation.
//!
//! The decision function merging four independent entitlement sources into
//! one boolean. It is pure: no I/O, no clock reads. Expiry comparisons happen
//! upstream where the facts are assembled, so the function stays trivially
//! testable against every input combination.

use serde::{Deserialize, Serialize};

/// Pre-fetched entitlement facts for one (user, resource) pair.
///
/// Assembled by the fact provider in a single pass; each flag is already
/// resolved against the current time where expiry applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementFacts {
    /// Caller holds admin rights (checked independently of the coarse role).
    pub is_admin: bool,
    /// The resource is free content.
    pub resource_is_free: bool,
    /// Caller has a currently-active, unexpired subscription.
    pub has_active_subscription: bool,
    /// Caller has an unexpired individual grant for this resource.
    pub has_individual_grant: bool,
}

impl EntitlementFacts {
    /// Facts that deny everything; useful as a safe default.
    pub fn none() -> Self {
        Self {
            is_admin: false,
            resource_is_free: false,
            has_active_subscription: false,
            has_individual_grant: false,
        }
    }
}

/// Decide whether the caller may access the resource.
///
/// Precedence, short-circuiting cheapest case first:
/// 1. admin → allowed, unconditionally
/// 2. free resource → allowed
/// 3. active subscription → allowed
/// 4. unexpired individual grant → allowed
/// 5. otherwise denied
pub fn has_access(facts: &EntitlementFacts) -> bool {
    if facts.is_admin {
        return true;
    }
    if facts.resource_is_free {
        return true;
    }
    if facts.has_active_subscription {
        return true;
    }
    facts.has_individual_grant
}
