//! Per-submitter in-flight accounting and admission policy.
//!
//! Every submitter has an in-flight counter and an optional penalty deadline.
//! Hitting the per-submitter cap is punished: the rejected submitter is put on
//! cooldown for the configured penalty window and every attempt during that
//! window is refused with a retry hint.
//!
//! Counters must come back to their pre-submission value once a job settles,
//! whichever way it settles. [`InFlightGuard`] carries the units for a job and
//! gives them back on drop, so no exit path can skip the decrement.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::core::AdmissionDenied;
use crate::util::clock::{Clock, SystemClock};

/// Identity of the user or agent a job is queued for.
pub type SubmitterId = String;

#[derive(Debug, Clone, Copy, Default)]
struct LedgerEntry {
    in_flight: usize,
    cooldown_until_ms: Option<u128>,
}

/// Admission limits applied by the ledger.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionPolicy {
    /// Maximum outstanding jobs per submitter.
    pub max_per_submitter: usize,
    /// Cooldown imposed on a submitter that hits the cap.
    pub penalty: Duration,
}

/// Submitter bookkeeping: in-flight counts and cooldown deadlines.
pub struct SubmitterLedger {
    entries: RwLock<HashMap<SubmitterId, LedgerEntry>>,
    policy: AdmissionPolicy,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SubmitterLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmitterLedger")
            .field("submitters", &self.entries.read().len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl SubmitterLedger {
    /// Ledger reading time from the system clock.
    #[must_use]
    pub fn new(policy: AdmissionPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    /// Ledger with an injected time source.
    #[must_use]
    pub fn with_clock(policy: AdmissionPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            policy,
            clock,
        }
    }

    /// Policy in force.
    #[must_use]
    pub const fn policy(&self) -> AdmissionPolicy {
        self.policy
    }

    /// Check whether one more job may be admitted for `submitter`.
    ///
    /// # Errors
    ///
    /// `CooldownActive` while a penalty runs; `QueueFull` (which starts a new
    /// penalty) when the submitter is at the cap.
    pub fn can_admit(&self, submitter: &str) -> Result<(), AdmissionDenied> {
        self.can_admit_batch(submitter, 1)
    }

    /// Check whether `count` more jobs may be admitted together.
    ///
    /// # Errors
    ///
    /// Same as [`can_admit`](Self::can_admit), with the cap test widened to
    /// `in_flight + count > cap`.
    pub fn can_admit_batch(&self, submitter: &str, count: usize) -> Result<(), AdmissionDenied> {
        let now = self.clock.now_ms();
        let mut entries = self.entries.write();
        let entry = entries.entry(submitter.to_owned()).or_default();

        if let Some(until) = entry.cooldown_until_ms {
            if now < until {
                let remaining = u64::try_from(until - now).unwrap_or(u64::MAX);
                return Err(AdmissionDenied::CooldownActive {
                    retry_after: Duration::from_millis(remaining),
                });
            }
        }

        if entry.in_flight.saturating_add(count) > self.policy.max_per_submitter {
            entry.cooldown_until_ms = Some(now + self.policy.penalty.as_millis());
            tracing::warn!(
                submitter,
                in_flight = entry.in_flight,
                requested = count,
                cap = self.policy.max_per_submitter,
                "submitter over cap, cooldown started"
            );
            return Err(AdmissionDenied::QueueFull {
                cap: self.policy.max_per_submitter,
            });
        }
        Ok(())
    }

    /// Add `count` in-flight jobs.
    pub fn increment(&self, submitter: &str, count: usize) {
        let mut entries = self.entries.write();
        entries.entry(submitter.to_owned()).or_default().in_flight += count;
    }

    /// Remove `count` in-flight jobs, saturating at zero.
    pub fn decrement(&self, submitter: &str, count: usize) {
        let mut entries = self.entries.write();
        if let Some(entry) = entries.get_mut(submitter) {
            entry.in_flight = entry.in_flight.saturating_sub(count);
        }
    }

    /// Increment now and hand back a guard that undoes it on drop.
    pub fn reserve(self: &Arc<Self>, submitter: &str, count: usize) -> InFlightGuard {
        self.increment(submitter, count);
        InFlightGuard {
            ledger: Arc::clone(self),
            submitter: submitter.to_owned(),
            units: count,
        }
    }

    /// Zero the in-flight count and lift any cooldown.
    ///
    /// Jobs still running when this is called decrement on completion; the
    /// counter saturates at zero rather than underflowing.
    pub fn reset(&self, submitter: &str) {
        let mut entries = self.entries.write();
        let entry = entries.entry(submitter.to_owned()).or_default();
        entry.in_flight = 0;
        entry.cooldown_until_ms = None;
        drop(entries);
        tracing::info!(submitter, "submitter ledger reset");
    }

    /// Current in-flight count.
    #[must_use]
    pub fn in_flight(&self, submitter: &str) -> usize {
        self.entries
            .read()
            .get(submitter)
            .map_or(0, |entry| entry.in_flight)
    }

    /// Time left on the submitter's penalty, if one is running.
    #[must_use]
    pub fn cooldown_remaining(&self, submitter: &str) -> Option<Duration> {
        let now = self.clock.now_ms();
        let until = self.entries.read().get(submitter)?.cooldown_until_ms?;
        (now < until).then(|| Duration::from_millis(u64::try_from(until - now).unwrap_or(u64::MAX)))
    }
}

/// In-flight units owed back to the ledger.
#[derive(Debug)]
pub struct InFlightGuard {
    ledger: Arc<SubmitterLedger>,
    submitter: SubmitterId,
    units: usize,
}

impl InFlightGuard {
    /// Submitter the units belong to.
    #[must_use]
    pub fn submitter(&self) -> &str {
        &self.submitter
    }

    /// Units still held.
    #[must_use]
    pub const fn units(&self) -> usize {
        self.units
    }

    /// Move one unit into its own guard, for handing to a single job.
    pub fn split_one(&mut self) -> Option<Self> {
        if self.units == 0 {
            return None;
        }
        self.units -= 1;
        Some(Self {
            ledger: Arc::clone(&self.ledger),
            submitter: self.submitter.clone(),
            units: 1,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.units > 0 {
            self.ledger.decrement(&self.submitter, self.units);
        }
    }
}
