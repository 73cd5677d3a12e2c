//! Audit sink implementations.
//!
//! The scheduler reports job lifecycle and admission decisions to an optional
//! sink. The in-memory sink keeps a bounded ring of recent events and can be
//! cloned so the host keeps a reading handle after passing one to the
//! scheduler.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::SlotId;
use crate::util::clock::now_ms;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Job appended to the work queue.
    Enqueue,
    /// Job bound to a slot and handed to the executor.
    Start,
    /// Executor returned a value.
    Complete,
    /// Executor failed or the job was abandoned.
    Fail,
    /// Admission refused.
    Deny,
    /// Submitter ledger reset by an administrator.
    Reset,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Enqueue => "enqueue",
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Fail => "fail",
            Self::Deny => "deny",
            Self::Reset => "reset",
        };
        f.write_str(name)
    }
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Related job, when the event concerns one.
    pub job_id: Option<String>,
    /// Submitter the event is accounted to.
    pub submitter: String,
    /// Action taken.
    pub action: AuditAction,
    /// Credential slot involved, if any.
    pub slot: Option<SlotId>,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// Bounded in-memory audit sink for testing and dev.
#[derive(Debug, Clone)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<VecDeque<AuditEvent>>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Snapshot of events with the given action.
    #[must_use]
    pub fn events_with(&self, action: AuditAction) -> Vec<AuditEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.action == action)
            .cloned()
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Sink that forwards events to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&mut self, event: AuditEvent) {
        tracing::info!(
            target: "credential_lot::audit",
            action = %event.action,
            submitter = %event.submitter,
            job_id = event.job_id.as_deref().unwrap_or("-"),
            slot = ?event.slot,
            detail = event.detail.as_deref().unwrap_or(""),
            "audit"
        );
    }
}

/// Helper to build an audit event from context.
pub fn build_audit_event(
    job_id: Option<String>,
    submitter: impl Into<String>,
    action: AuditAction,
    slot: Option<SlotId>,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        job_id,
        submitter: submitter.into(),
        action,
        slot,
        created_at_ms: now_ms(),
        detail,
    }
}
