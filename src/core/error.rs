//! Error types for scheduler operations.

use std::time::Duration;

use thiserror::Error;

/// Why a submitter was refused admission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionDenied {
    /// The submitter is serving a penalty window.
    #[error("cooldown active, retry in {}s", secs_ceil(.retry_after))]
    CooldownActive {
        /// Time left before the penalty expires.
        retry_after: Duration,
    },
    /// The submitter already has the maximum number of outstanding jobs.
    #[error("submitter queue full (cap {cap})")]
    QueueFull {
        /// Configured per-submitter cap.
        cap: usize,
    },
}

impl AdmissionDenied {
    /// Retry hint rounded up to whole seconds, if one applies.
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::CooldownActive { retry_after } => Some(secs_ceil(retry_after)),
            Self::QueueFull { .. } => None,
        }
    }
}

fn secs_ceil(d: &Duration) -> u64 {
    d.as_millis().div_ceil(1000).try_into().unwrap_or(u64::MAX)
}

/// Errors produced by scheduler components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Admission control refused the submission.
    #[error("admission denied: {0}")]
    AdmissionDenied(#[from] AdmissionDenied),
    /// A resubmission asked for more jobs than allowed.
    #[error("resubmit count {requested} outside 1..={max}")]
    ResubmitLimit {
        /// Jobs requested.
        requested: usize,
        /// Configured maximum per resubmission.
        max: usize,
    },
    /// Resubmission requested but the submitter has no remembered job.
    #[error("no previous job to resubmit")]
    NoPreviousJob,
    /// Caller lacks the authority for an administrative operation.
    #[error("permission denied")]
    PermissionDenied,
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Terminal failure of a single job, delivered through its handle.
#[derive(Debug, Error)]
pub enum JobError {
    /// The executor reported a failure. Never retried by the scheduler.
    #[error("executor failure: {0}")]
    Executor(anyhow::Error),
    /// The job settled without producing an outcome (executor panicked).
    #[error("job abandoned before completion")]
    Abandoned,
}

/// Application-facing result using anyhow for executor contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
