//! Submission-layer API consumed by the command surface.
//!
//! [`SubmissionGate`] wraps a [`Scheduler`] with the policy a chat-command
//! front end needs: admission-checked submission, a per-submitter memory of
//! the last job so it can be redrawn, batched resubmission under the resubmit
//! lock, queue-position reporting, and a privileged ledger reset. Callers
//! never deal with slot identities.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::core::{
    Job, JobExecutor, JobHandle, JobKind, QueueStatus, ResubmitGuard, Scheduler, SchedulerError,
    Spawn, SubmitterId,
};

/// Minimum caller authority for [`SubmissionGate::reset`].
pub const RESET_AUTHORITY: u32 = 3;

/// An admitted job and the queue picture right after it was enqueued.
#[derive(Debug)]
pub struct Submitted<R> {
    /// Outcome handle.
    pub handle: JobHandle<R>,
    /// Outstanding work including this job.
    pub status: QueueStatus,
}

/// Admission-checked front door to a scheduler.
pub struct SubmissionGate<P, R, E, S> {
    scheduler: Scheduler<P, R, E, S>,
    last_jobs: Mutex<HashMap<SubmitterId, P>>,
    max_resubmit_count: usize,
}

impl<P, R, E, S> SubmissionGate<P, R, E, S>
where
    P: Clone + Send + 'static,
    R: Send + 'static,
    E: JobExecutor<P, R>,
    S: Spawn + Send + Sync + 'static,
{
    /// Wrap a scheduler. `max_resubmit_count` bounds a single resubmission.
    pub fn new(scheduler: Scheduler<P, R, E, S>, max_resubmit_count: usize) -> Self {
        Self {
            scheduler,
            last_jobs: Mutex::new(HashMap::new()),
            max_resubmit_count,
        }
    }

    /// Underlying scheduler.
    pub const fn scheduler(&self) -> &Scheduler<P, R, E, S> {
        &self.scheduler
    }

    /// Admit and enqueue one job, remembering it for later resubmission.
    ///
    /// # Errors
    ///
    /// `SchedulerError::AdmissionDenied` on cooldown or cap.
    pub fn submit(&self, submitter: &str, payload: P) -> Result<Submitted<R>, SchedulerError> {
        let reservation = self.scheduler.admit(submitter, 1)?;
        self.last_jobs
            .lock()
            .insert(submitter.to_owned(), payload.clone());

        let handle = self
            .scheduler
            .submit_reserved(Job::ordinary(submitter, payload), reservation);
        let status = self.scheduler.status(submitter);
        tracing::debug!(
            submitter,
            job_id = %handle.id(),
            total = status.total_outstanding,
            own = status.submitter_outstanding,
            "job admitted"
        );
        Ok(Submitted { handle, status })
    }

    /// Re-enqueue the submitter's last job `count` times as one contiguous
    /// batch.
    ///
    /// The whole check-and-enqueue sequence runs under the resubmit lock, so
    /// concurrent resubmissions are applied one after another.
    ///
    /// # Errors
    ///
    /// `NoPreviousJob` without a remembered job, `ResubmitLimit` when `count`
    /// is zero or above the configured maximum, `AdmissionDenied` when the
    /// batch does not fit the submitter's cap (which starts a cooldown).
    pub async fn resubmit(
        &self,
        submitter: &str,
        count: usize,
    ) -> Result<Vec<JobHandle<R>>, SchedulerError> {
        let _lock = self.scheduler.acquire_resubmit_lock().await;

        let payload = self
            .last_jobs
            .lock()
            .get(submitter)
            .cloned()
            .ok_or(SchedulerError::NoPreviousJob)?;
        if count == 0 || count > self.max_resubmit_count {
            return Err(SchedulerError::ResubmitLimit {
                requested: count,
                max: self.max_resubmit_count,
            });
        }

        let mut reservation = self.scheduler.admit(submitter, count)?;
        let batch: Vec<_> = std::iter::from_fn(|| reservation.split_one())
            .map(|unit| {
                let job = Job::new(submitter, JobKind::Resubmission, payload.clone());
                (job, unit)
            })
            .collect();

        tracing::info!(submitter, count = batch.len(), "resubmission batch enqueued");
        Ok(self.scheduler.submit_batch(batch))
    }

    /// Take the resubmit lock for a caller-composed batch.
    pub async fn acquire_resubmit_lock(&self) -> ResubmitGuard {
        self.scheduler.acquire_resubmit_lock().await
    }

    /// Outstanding work overall and for `submitter`.
    #[must_use]
    pub fn status(&self, submitter: &str) -> QueueStatus {
        self.scheduler.status(submitter)
    }

    /// Whether the submitter has a job that can be resubmitted.
    #[must_use]
    pub fn has_last_job(&self, submitter: &str) -> bool {
        self.last_jobs.lock().contains_key(submitter)
    }

    /// Clear `target`'s ledger state on behalf of a privileged caller.
    ///
    /// # Errors
    ///
    /// `PermissionDenied` when `caller_authority` is below
    /// [`RESET_AUTHORITY`].
    pub fn reset(&self, target: &str, caller_authority: u32) -> Result<(), SchedulerError> {
        if caller_authority < RESET_AUTHORITY {
            tracing::warn!(target_submitter = target, caller_authority, "reset refused");
            return Err(SchedulerError::PermissionDenied);
        }
        self.scheduler.reset(target);
        Ok(())
    }
}
