//! Work queue and credential scheduler.
//!
//! Jobs wait in a FIFO queue until a credential slot frees up. [`Scheduler::drain`]
//! matches free slots to queued jobs and launches the executor for each pair;
//! every settled job returns its slot and drains again, so queued work chases
//! freed slots without polling.
//!
//! Slot acquisition and queue pops happen under the queue mutex, which makes
//! redundant or concurrent drains harmless: each pop is paired with exactly
//! one slot and a drain with nothing to do returns immediately.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::core::{
    build_audit_event, AppResult, AuditAction, AuditSink, CredentialPool, InFlightGuard, Job,
    JobError, JobExecutor, JobHandle, JobId, JobState, ResubmitGuard, ResubmitMutex, SchedulerError,
    SlotBinding, SlotId, SlotLease, SubmitterId, SubmitterLedger,
};
use crate::infra::queue::FifoQueue;

/// Abstraction for spawning job execution on a runtime.
pub trait Spawn {
    /// Spawn a detached future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Outstanding work as seen by one submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Queued plus executing jobs across all submitters.
    pub total_outstanding: usize,
    /// The submitter's own in-flight count.
    pub submitter_outstanding: usize,
}

/// Point-in-time scheduler counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Number of credential slots.
    pub pool_size: usize,
    /// Slots currently occupied.
    pub occupied_slots: usize,
    /// Jobs waiting in the queue.
    pub queued: usize,
    /// Jobs (and borrowed slots) currently executing.
    pub in_flight: usize,
    /// Jobs ever enqueued.
    pub submitted: u64,
    /// Jobs that completed successfully.
    pub completed: u64,
    /// Jobs that failed or were abandoned.
    pub failed: u64,
}

/// Optional scheduler wiring.
pub struct SchedulerOptions {
    /// Audit sink receiving lifecycle events.
    pub audit: Option<Box<dyn AuditSink>>,
    /// Delay before the resubmit lock passes to the next waiter.
    pub resubmit_handoff: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            audit: None,
            resubmit_handoff: crate::core::resubmit::DEFAULT_HANDOFF_DELAY,
        }
    }
}

struct QueuedJob<P, R> {
    job: Job<P>,
    sink: oneshot::Sender<Result<R, JobError>>,
    reservation: InFlightGuard,
}

struct Shared<P, R, E, S> {
    pool: Arc<CredentialPool>,
    ledger: Arc<SubmitterLedger>,
    queue: Mutex<FifoQueue<QueuedJob<P, R>>>,
    in_flight: AtomicUsize,
    draining: AtomicBool,
    redrain: AtomicBool,
    completed: AtomicU64,
    failed: AtomicU64,
    resubmit: ResubmitMutex,
    audit: Option<Mutex<Box<dyn AuditSink>>>,
    executor: E,
    spawner: S,
}

impl<P, R, E, S> Shared<P, R, E, S> {
    fn record_audit(
        &self,
        job_id: Option<JobId>,
        submitter: &str,
        action: AuditAction,
        slot: Option<SlotId>,
        detail: Option<String>,
    ) {
        if let Some(audit) = &self.audit {
            audit.lock().record(build_audit_event(
                job_id.map(|id| id.to_string()),
                submitter,
                action,
                slot,
                detail,
            ));
        }
    }
}

/// Credential-pool scheduler. Cheap to clone; clones share all state.
pub struct Scheduler<P, R, E, S> {
    shared: Arc<Shared<P, R, E, S>>,
}

impl<P, R, E, S> Clone for Scheduler<P, R, E, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P, R, E, S> Scheduler<P, R, E, S>
where
    P: Send + 'static,
    R: Send + 'static,
    E: JobExecutor<P, R>,
    S: Spawn + Send + Sync + 'static,
{
    /// Assemble a scheduler from its parts.
    pub fn new(
        pool: CredentialPool,
        ledger: SubmitterLedger,
        executor: E,
        spawner: S,
        options: SchedulerOptions,
    ) -> Self {
        tracing::info!(slots = pool.size(), "scheduler created");
        Self {
            shared: Arc::new(Shared {
                pool: Arc::new(pool),
                ledger: Arc::new(ledger),
                queue: Mutex::new(FifoQueue::new()),
                in_flight: AtomicUsize::new(0),
                draining: AtomicBool::new(false),
                redrain: AtomicBool::new(false),
                completed: AtomicU64::new(0),
                failed: AtomicU64::new(0),
                resubmit: ResubmitMutex::new(options.resubmit_handoff),
                audit: options.audit.map(Mutex::new),
                executor,
                spawner,
            }),
        }
    }

    /// Credential pool backing the scheduler.
    #[must_use]
    pub fn pool(&self) -> &Arc<CredentialPool> {
        &self.shared.pool
    }

    /// Submitter ledger backing the scheduler.
    #[must_use]
    pub fn ledger(&self) -> &Arc<SubmitterLedger> {
        &self.shared.ledger
    }

    /// Admission check plus reservation of `count` in-flight units.
    ///
    /// # Errors
    ///
    /// `SchedulerError::AdmissionDenied` when the submitter is cooling down or
    /// would exceed the cap. Denials are audited.
    pub fn admit(&self, submitter: &str, count: usize) -> Result<InFlightGuard, SchedulerError> {
        if let Err(denied) = self.shared.ledger.can_admit_batch(submitter, count) {
            tracing::info!(submitter, requested = count, %denied, "admission denied");
            self.shared.record_audit(
                None,
                submitter,
                AuditAction::Deny,
                None,
                Some(denied.to_string()),
            );
            return Err(denied.into());
        }
        Ok(self.shared.ledger.reserve(submitter, count))
    }

    /// Enqueue a job, accounting one in-flight unit to its submitter, and
    /// start it right away if a slot is free.
    pub fn submit(&self, job: Job<P>) -> JobHandle<R> {
        let reservation = self.shared.ledger.reserve(&job.submitter, 1);
        self.submit_reserved(job, reservation)
    }

    /// Enqueue a job whose in-flight unit was reserved by the caller. The
    /// unit is returned to the ledger when the job settles.
    pub fn submit_reserved(&self, job: Job<P>, reservation: InFlightGuard) -> JobHandle<R> {
        let (record, handle) = Self::prepare(job, reservation);
        self.enqueue(vec![record]);
        handle
    }

    /// Enqueue several jobs contiguously under one queue lock, in order.
    pub fn submit_batch(&self, jobs: Vec<(Job<P>, InFlightGuard)>) -> Vec<JobHandle<R>> {
        let (records, handles): (Vec<_>, Vec<_>) = jobs
            .into_iter()
            .map(|(job, reservation)| Self::prepare(job, reservation))
            .unzip();
        self.enqueue(records);
        handles
    }

    fn prepare(job: Job<P>, reservation: InFlightGuard) -> (QueuedJob<P, R>, JobHandle<R>) {
        debug_assert_eq!(job.submitter, reservation.submitter());
        let (sink, rx) = oneshot::channel();
        let handle = JobHandle::new(job.id, rx);
        (
            QueuedJob {
                job,
                sink,
                reservation,
            },
            handle,
        )
    }

    fn enqueue(&self, records: Vec<QueuedJob<P, R>>) {
        let count = records.len();
        for record in &records {
            self.shared.record_audit(
                Some(record.job.id),
                &record.job.submitter,
                AuditAction::Enqueue,
                None,
                None,
            );
        }

        let depth = {
            let mut queue = self.shared.queue.lock();
            queue.extend_back(records);
            queue.len()
        };
        tracing::debug!(jobs = count, depth, state = %JobState::Queued, "jobs enqueued");

        self.drain();
    }

    /// Match free slots to queued jobs until either runs out.
    pub fn drain(&self) {
        Self::drain_shared(&self.shared);
    }

    /// Non-reentrant: a drain requested while another is running (including
    /// one triggered from a settlement dropped inside `launch`) only flags a
    /// rerun for the active drainer.
    fn drain_shared(shared: &Arc<Shared<P, R, E, S>>) {
        loop {
            if shared
                .draining
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                shared.redrain.store(true, Ordering::SeqCst);
                if shared.draining.load(Ordering::SeqCst) {
                    return;
                }
                // The active drainer left before seeing the flag; take over.
                continue;
            }

            {
                let _active = DrainFlag(&shared.draining);
                shared.redrain.store(false, Ordering::SeqCst);
                Self::drain_pass(shared);
            }

            if !shared.redrain.swap(false, Ordering::SeqCst) {
                return;
            }
        }
    }

    fn drain_pass(shared: &Arc<Shared<P, R, E, S>>) {
        loop {
            let (record, lease) = {
                let mut queue = shared.queue.lock();
                if queue.is_empty() {
                    return;
                }
                let Some(lease) = shared.pool.lease() else {
                    tracing::trace!(queued = queue.len(), "all credential slots busy");
                    return;
                };
                let Some(record) = queue.pop_front() else {
                    return;
                };
                shared.in_flight.fetch_add(1, Ordering::AcqRel);
                (record, lease)
            };
            Self::launch(shared, record, lease);
        }
    }

    fn launch(shared: &Arc<Shared<P, R, E, S>>, record: QueuedJob<P, R>, lease: SlotLease) {
        let QueuedJob {
            job,
            sink,
            reservation,
        } = record;

        let binding = SlotBinding {
            job_id: job.id,
            submitter: job.submitter.clone(),
            kind: job.kind,
            slot: lease.slot(),
            credential: lease.credential().cloned(),
        };
        tracing::info!(
            job_id = %job.id,
            slot = binding.slot,
            submitter = %job.submitter,
            state = %JobState::Bound,
            "job bound to credential slot"
        );
        shared.record_audit(
            Some(job.id),
            &job.submitter,
            AuditAction::Start,
            Some(binding.slot),
            None,
        );

        let settlement = Settlement {
            shared: Arc::clone(shared),
            job_id: job.id,
            submitter: job.submitter,
            slot: binding.slot,
            sink: Some(sink),
            reservation: Some(reservation),
            lease: Some(lease),
        };
        let payload = job.payload;
        let task_shared = Arc::clone(shared);
        shared.spawner.spawn(async move {
            tracing::debug!(job_id = %binding.job_id, state = %JobState::Executing, "executing job");
            let outcome = task_shared.executor.execute(payload, binding).await;
            settlement.finish(outcome);
        });
    }

    /// Outstanding work overall and for `submitter`.
    #[must_use]
    pub fn status(&self, submitter: &str) -> QueueStatus {
        let queued = self.shared.queue.lock().len();
        QueueStatus {
            total_outstanding: queued + self.shared.in_flight.load(Ordering::Acquire),
            submitter_outstanding: self.shared.ledger.in_flight(submitter),
        }
    }

    /// Snapshot of scheduler counters.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        let (queued, submitted) = {
            let queue = self.shared.queue.lock();
            (queue.len(), queue.enqueued_total())
        };
        SchedulerStats {
            pool_size: self.shared.pool.size(),
            occupied_slots: self.shared.pool.occupied(),
            queued,
            in_flight: self.shared.in_flight.load(Ordering::Acquire),
            submitted,
            completed: self.shared.completed.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
        }
    }

    /// Zero a submitter's in-flight count and lift its cooldown.
    pub fn reset(&self, submitter: &str) {
        self.shared.ledger.reset(submitter);
        self.shared
            .record_audit(None, submitter, AuditAction::Reset, None, None);
    }

    /// Wait for the resubmit lock.
    pub async fn acquire_resubmit_lock(&self) -> ResubmitGuard {
        self.shared.resubmit.acquire().await
    }

    /// The resubmit lock itself, for observers.
    #[must_use]
    pub fn resubmit_lock(&self) -> &ResubmitMutex {
        &self.shared.resubmit
    }

    /// Take a credential slot for work that does not go through the queue.
    ///
    /// The borrowed slot counts as in-flight work. Dropping it releases the
    /// slot and drains the queue.
    #[must_use]
    pub fn borrow_slot(&self) -> Option<BorrowedSlot<P, R, E, S>> {
        let lease = self.shared.pool.lease()?;
        self.shared.in_flight.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(slot = lease.slot(), "credential slot borrowed outside the queue");
        Some(BorrowedSlot {
            lease: Some(lease),
            scheduler: self.clone(),
        })
    }
}

/// Clears the draining flag on exit, unwinding included.
struct DrainFlag<'a>(&'a AtomicBool);

impl Drop for DrainFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Settles a launched job. Whatever happens to the executor future, dropping
/// this returns the ledger unit, frees the slot and drains again.
struct Settlement<P, R, E, S>
where
    P: Send + 'static,
    R: Send + 'static,
    E: JobExecutor<P, R>,
    S: Spawn + Send + Sync + 'static,
{
    shared: Arc<Shared<P, R, E, S>>,
    job_id: JobId,
    submitter: SubmitterId,
    slot: SlotId,
    sink: Option<oneshot::Sender<Result<R, JobError>>>,
    reservation: Option<InFlightGuard>,
    lease: Option<SlotLease>,
}

impl<P, R, E, S> Settlement<P, R, E, S>
where
    P: Send + 'static,
    R: Send + 'static,
    E: JobExecutor<P, R>,
    S: Spawn + Send + Sync + 'static,
{
    fn finish(mut self, outcome: AppResult<R>) {
        let (action, state, detail) = match &outcome {
            Ok(_) => (AuditAction::Complete, JobState::Completed, None),
            Err(e) => (AuditAction::Fail, JobState::Failed, Some(e.to_string())),
        };
        match &detail {
            None => {
                self.shared.completed.fetch_add(1, Ordering::Relaxed);
                tracing::info!(job_id = %self.job_id, slot = self.slot, %state, "job settled");
            }
            Some(reason) => {
                self.shared.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(job_id = %self.job_id, slot = self.slot, %state, reason, "job settled");
            }
        }
        self.shared
            .record_audit(Some(self.job_id), &self.submitter, action, Some(self.slot), detail);

        if let Some(sink) = self.sink.take() {
            if sink.send(outcome.map_err(JobError::Executor)).is_err() {
                tracing::debug!(job_id = %self.job_id, "job handle dropped, outcome discarded");
            }
        }
    }
}

impl<P, R, E, S> Drop for Settlement<P, R, E, S>
where
    P: Send + 'static,
    R: Send + 'static,
    E: JobExecutor<P, R>,
    S: Spawn + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if let Some(sink) = self.sink.take() {
            self.shared.failed.fetch_add(1, Ordering::Relaxed);
            tracing::error!(job_id = %self.job_id, slot = self.slot, "job abandoned without an outcome");
            self.shared.record_audit(
                Some(self.job_id),
                &self.submitter,
                AuditAction::Fail,
                Some(self.slot),
                Some("abandoned".into()),
            );
            let _ = sink.send(Err(JobError::Abandoned));
        }
        drop(self.reservation.take());
        self.shared.in_flight.fetch_sub(1, Ordering::AcqRel);
        drop(self.lease.take());
        Scheduler::<P, R, E, S>::drain_shared(&self.shared);
    }
}

/// A credential slot taken outside the queue.
pub struct BorrowedSlot<P, R, E, S>
where
    P: Send + 'static,
    R: Send + 'static,
    E: JobExecutor<P, R>,
    S: Spawn + Send + Sync + 'static,
{
    lease: Option<SlotLease>,
    scheduler: Scheduler<P, R, E, S>,
}

impl<P, R, E, S> BorrowedSlot<P, R, E, S>
where
    P: Send + 'static,
    R: Send + 'static,
    E: JobExecutor<P, R>,
    S: Spawn + Send + Sync + 'static,
{
    /// The borrowed slot.
    #[must_use]
    pub fn slot(&self) -> Option<SlotId> {
        self.lease.as_ref().map(SlotLease::slot)
    }

    /// Credential behind the borrowed slot.
    #[must_use]
    pub fn credential(&self) -> Option<&crate::core::Credential> {
        self.lease.as_ref().and_then(SlotLease::credential)
    }
}

impl<P, R, E, S> Drop for BorrowedSlot<P, R, E, S>
where
    P: Send + 'static,
    R: Send + 'static,
    E: JobExecutor<P, R>,
    S: Spawn + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.scheduler
            .shared
            .in_flight
            .fetch_sub(1, Ordering::AcqRel);
        drop(self.lease.take());
        self.scheduler.drain();
    }
}
