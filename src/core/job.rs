//! Job records, identities, and completion handles.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::core::{JobError, SubmitterId};

/// Unique job identifier.
pub type JobId = Uuid;

/// Which path put a job on the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// A fresh submission.
    Ordinary,
    /// A replay of an earlier job, enqueued as part of a batch.
    Resubmission,
}

/// Lifecycle of a job inside the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting in the work queue.
    Queued,
    /// Popped and bound to a credential slot.
    Bound,
    /// Executor running.
    Executing,
    /// Executor returned a value.
    Completed,
    /// Executor failed or the job was abandoned.
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Queued => "queued",
            Self::Bound => "bound",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A unit of work waiting for a credential.
#[derive(Debug, Clone)]
pub struct Job<P> {
    /// Job identifier.
    pub id: JobId,
    /// Submitter the job is accounted to.
    pub submitter: SubmitterId,
    /// Submission path.
    pub kind: JobKind,
    /// Opaque executor input.
    pub payload: P,
}

impl<P> Job<P> {
    /// New job with a fresh identifier.
    pub fn new(submitter: impl Into<SubmitterId>, kind: JobKind, payload: P) -> Self {
        Self {
            id: Uuid::new_v4(),
            submitter: submitter.into(),
            kind,
            payload,
        }
    }

    /// Shorthand for an ordinary submission.
    pub fn ordinary(submitter: impl Into<SubmitterId>, payload: P) -> Self {
        Self::new(submitter, JobKind::Ordinary, payload)
    }
}

/// Receives the outcome of a submitted job.
///
/// Dropping the handle does not cancel the job: it still runs and its slot
/// and ledger units are still returned; the outcome is discarded.
#[derive(Debug)]
pub struct JobHandle<R> {
    id: JobId,
    rx: oneshot::Receiver<Result<R, JobError>>,
}

impl<R> JobHandle<R> {
    pub(crate) const fn new(id: JobId, rx: oneshot::Receiver<Result<R, JobError>>) -> Self {
        Self { id, rx }
    }

    /// Identifier of the job this handle tracks.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Wait for the job to settle.
    ///
    /// # Errors
    ///
    /// `JobError::Executor` when the executor failed, `JobError::Abandoned`
    /// when it never produced an outcome.
    pub async fn wait(self) -> Result<R, JobError> {
        self.rx.await.unwrap_or_else(|_| Err(JobError::Abandoned))
    }
}
