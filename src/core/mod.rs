//! Core scheduling abstractions and credential accounting.

pub mod audit;
pub mod credential_pool;
pub mod error;
pub mod executor;
pub mod job;
pub mod ledger;
pub mod resubmit;
pub mod scheduler;

pub use audit::{
    build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink,
};
pub use credential_pool::{Credential, CredentialPool, SlotId, SlotLease};
pub use error::{AdmissionDenied, AppResult, JobError, SchedulerError};
pub use executor::{JobExecutor, SlotBinding};
pub use job::{Job, JobHandle, JobId, JobKind, JobState};
pub use ledger::{AdmissionPolicy, InFlightGuard, SubmitterId, SubmitterLedger};
pub use resubmit::{ResubmitGuard, ResubmitMutex};
pub use scheduler::{
    BorrowedSlot, QueueStatus, Scheduler, SchedulerOptions, SchedulerStats, Spawn,
};
