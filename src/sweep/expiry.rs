//! Subscription expiry sweep.
//!
//! A stateless batch task an external scheduler invokes (e.g. hourly). It
//! finds subscriptions still flagged active whose expiry has passed,
//! deactivates each inside its own unit of work, and demotes owners left
//! without any active subscription. The selection predicate
//! (`is_active && expires_at <= now`) excludes already-processed rows, so
//! at-least-once scheduling and concurrent runs are safe.
//!
//! The sweep exists so the hot-path "has-active-subscription" fact stays a
//! cheap flag read; the fact provider still re-checks expiry live, so a
//! missed cycle degrades to correct denials rather than stale access.

use crate::clock::Clock;
use crate::domain::models::SubscriptionId;
use crate::store::EntitlementStore;
use crate::PaywardenError;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Cooperative stop flag for orderly shutdown mid-batch.
///
/// The sweep checks it between items; in-flight per-item work always
/// completes.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    /// Create a signal in the running state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the sweep to stop after the current item.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    /// Whether stop was requested.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }
}

/// Summary of one sweep run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Subscriptions deactivated by this run.
    pub processed: usize,
    /// Owners demoted from subscriber-tier to plain-tier.
    pub demoted: usize,
    /// Candidates skipped because stop was requested.
    pub skipped: usize,
    /// Per-item failures (the batch continued past each).
    pub failures: Vec<(SubscriptionId, String)>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

impl SweepReport {
    /// Whether every selected candidate was processed cleanly.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.skipped == 0
    }
}

/// Run one expiry sweep over the store.
///
/// Each candidate is lapsed in its own unit of work; a failure on one is
/// logged, recorded in the report, and does not abort the rest of the batch.
/// Only the candidate selection itself is a hard error.
///
/// # Errors
/// `Transient` if the candidate selection query fails.
pub fn run_expiry_sweep(
    store: &dyn EntitlementStore,
    clock: &dyn Clock,
    stop: &StopSignal,
) -> Result<SweepReport, PaywardenError> {
    let now = clock.now_utc();
    let candidates = store.lapsed_subscriptions(now)?;
    let total = candidates.len();

    info!(candidates = total, "expiry sweep started");

    let mut processed = 0usize;
    let mut demoted = 0usize;
    let mut skipped = 0usize;
    let mut failures = Vec::new();

    for (index, id) in candidates.into_iter().enumerate() {
        if stop.is_stopped() {
            skipped = total - index;
            info!(skipped, "expiry sweep stopping on request");
            break;
        }

        match store.lapse_subscription(id, now) {
            Ok(outcome) => {
                if outcome.deactivated {
                    processed += 1;
                }
                if outcome.owner_demoted {
                    demoted += 1;
                }
            }
            Err(e) => {
                warn!(subscription_id = id.0, error = %e, "failed to lapse subscription");
                failures.push((id, e.to_string()));
            }
        }
    }

    let report = SweepReport {
        processed,
        demoted,
        skipped,
        failures,
        finished_at: clock.now_utc(),
    };

    info!(
        processed = report.processed,
        demoted = report.demoted,
        failed = report.failures.len(),
        "expiry sweep finished"
    );

    Ok(report)
}
