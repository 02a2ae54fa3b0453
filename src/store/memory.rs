//! In-memory entitlement store.
//!
//! The crate's single-process reference backend: mutex-guarded maps with the
//! same contract a SQL-backed implementation would honor. Each trait method
//! takes the lock once, so `lapse_subscription` is atomic per item the way
//! the sweep requires.

use crate::domain::models::{
    extend_expiry, FileId, FileRecord, IndividualGrant, Resource, ResourceId, Role, Subscription,
    SubscriptionId, User, UserId,
};
use crate::policy::access::EntitlementFacts;
use crate::store::provider::{EntitlementStore, GrantOutcome, LapseOutcome};
use crate::PaywardenError;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tracing::info;

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<UserId, User>,
    resources: HashMap<ResourceId, Resource>,
    files: HashMap<FileId, FileRecord>,
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
    grants: HashMap<(UserId, ResourceId), IndividualGrant>,
}

/// Mutex-guarded in-memory store implementing [`EntitlementStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, PaywardenError> {
        self.inner
            .lock()
            .map_err(|_| PaywardenError::Transient("store lock poisoned".to_string()))
    }

    /// Insert or replace a user.
    pub fn insert_user(&self, user: User) -> Result<(), PaywardenError> {
        self.lock()?.users.insert(user.id, user);
        Ok(())
    }

    /// Insert or replace a resource.
    pub fn insert_resource(&self, resource: Resource) -> Result<(), PaywardenError> {
        self.lock()?.resources.insert(resource.id, resource);
        Ok(())
    }

    /// Insert or replace a file.
    pub fn insert_file(&self, file: FileRecord) -> Result<(), PaywardenError> {
        self.lock()?.files.insert(file.id, file);
        Ok(())
    }

    /// Insert or replace a subscription.
    pub fn upsert_subscription(&self, subscription: Subscription) -> Result<(), PaywardenError> {
        self.lock()?
            .subscriptions
            .insert(subscription.id, subscription);
        Ok(())
    }

    /// Read back a user (test and admin tooling).
    pub fn user(&self, id: UserId) -> Result<Option<User>, PaywardenError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    /// Read back a subscription (test and admin tooling).
    pub fn subscription(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<Subscription>, PaywardenError> {
        Ok(self.lock()?.subscriptions.get(&id).cloned())
    }

    /// Read back a grant (test and admin tooling).
    pub fn grant(
        &self,
        user_id: UserId,
        resource_id: ResourceId,
    ) -> Result<Option<IndividualGrant>, PaywardenError> {
        Ok(self.lock()?.grants.get(&(user_id, resource_id)).cloned())
    }
}

impl EntitlementStore for MemoryStore {
    fn find_file(&self, file_id: FileId) -> Result<Option<FileRecord>, PaywardenError> {
        Ok(self.lock()?.files.get(&file_id).cloned())
    }

    fn entitlement_facts(
        &self,
        user_id: UserId,
        resource_id: ResourceId,
        now: DateTime<Utc>,
    ) -> Result<EntitlementFacts, PaywardenError> {
        let inner = self.lock()?;

        let is_admin = inner.users.get(&user_id).is_some_and(|u| u.is_admin);

        let resource_is_free = inner
            .resources
            .get(&resource_id)
            .is_some_and(|r| r.is_free);

        // Expiry re-checked live; the is_active flag alone is not trusted
        let has_active_subscription = inner
            .subscriptions
            .values()
            .any(|s| s.user_id == user_id && s.confers_access(now));

        let has_individual_grant = inner
            .grants
            .get(&(user_id, resource_id))
            .is_some_and(|g| g.is_live(now));

        Ok(EntitlementFacts {
            is_admin,
            resource_is_free,
            has_active_subscription,
            has_individual_grant,
        })
    }

    fn grant_access(
        &self,
        user_id: UserId,
        resource_id: ResourceId,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<GrantOutcome, PaywardenError> {
        let mut inner = self.lock()?;

        let outcome = match inner.grants.get_mut(&(user_id, resource_id)) {
            None => {
                inner.grants.insert(
                    (user_id, resource_id),
                    IndividualGrant {
                        user_id,
                        resource_id,
                        expires_at,
                    },
                );
                GrantOutcome::Created
            }
            Some(existing) => {
                let extended = extend_expiry(existing.expires_at, expires_at);
                if extended == existing.expires_at {
                    GrantOutcome::Unchanged
                } else {
                    existing.expires_at = extended;
                    GrantOutcome::Extended
                }
            }
        };

        info!(
            user_id = user_id.0,
            resource_id = resource_id.0,
            outcome = ?outcome,
            "access grant upserted"
        );

        Ok(outcome)
    }

    fn lapsed_subscriptions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<SubscriptionId>, PaywardenError> {
        Ok(self
            .lock()?
            .subscriptions
            .values()
            .filter(|s| s.is_lapsed(now))
            .map(|s| s.id)
            .collect())
    }

    fn lapse_subscription(
        &self,
        id: SubscriptionId,
        now: DateTime<Utc>,
    ) -> Result<LapseOutcome, PaywardenError> {
        let mut inner = self.lock()?;

        let owner = match inner.subscriptions.get_mut(&id) {
            Some(sub) if sub.is_active => {
                sub.is_active = false;
                sub.lapsed_at = Some(now);
                sub.user_id
            }
            // Already processed (or unknown): idempotent no-op
            _ => {
                return Ok(LapseOutcome {
                    deactivated: false,
                    owner_demoted: false,
                })
            }
        };

        let has_other_active = inner
            .subscriptions
            .values()
            .any(|s| s.user_id == owner && s.confers_access(now));

        let mut owner_demoted = false;
        if !has_other_active {
            if let Some(user) = inner.users.get_mut(&owner) {
                if user.role == Role::Subscriber {
                    user.role = Role::Plain;
                    owner_demoted = true;
                }
            }
        }

        Ok(LapseOutcome {
            deactivated: true,
            owner_demoted,
        })
    }
}
