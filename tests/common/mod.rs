//! Shared fixtures for integration tests: a recording executor whose jobs
//! can succeed, fail, panic, sleep or wait on a gate.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use credential_lot::core::{
    AppResult, Credential, CredentialPool, JobExecutor, JobId, JobKind, SlotBinding, SlotId,
};

/// What a test job does once it reaches the executor.
#[derive(Debug, Clone)]
pub enum Behavior {
    Succeed,
    Fail,
    Panic,
    Sleep(Duration),
    Gated(Arc<Semaphore>),
}

/// Test payload.
#[derive(Debug, Clone)]
pub struct Task {
    pub label: String,
    pub behavior: Behavior,
}

impl Task {
    pub fn ok(label: &str) -> Self {
        Self::with(label, Behavior::Succeed)
    }

    pub fn failing(label: &str) -> Self {
        Self::with(label, Behavior::Fail)
    }

    pub fn panicking(label: &str) -> Self {
        Self::with(label, Behavior::Panic)
    }

    pub fn sleeping(label: &str, ms: u64) -> Self {
        Self::with(label, Behavior::Sleep(Duration::from_millis(ms)))
    }

    pub fn gated(label: &str, gate: &Gate) -> Self {
        Self::with(label, Behavior::Gated(Arc::clone(&gate.0)))
    }

    fn with(label: &str, behavior: Behavior) -> Self {
        Self {
            label: label.to_string(),
            behavior,
        }
    }
}

/// Holds gated jobs until opened.
#[derive(Debug, Clone)]
pub struct Gate(Arc<Semaphore>);

impl Gate {
    pub fn closed() -> Self {
        Self(Arc::new(Semaphore::new(0)))
    }

    /// Let `n` gated jobs through.
    pub fn open(&self, n: usize) {
        self.0.add_permits(n);
    }
}

/// One executor invocation as observed by the test.
#[derive(Debug, Clone)]
pub struct Execution {
    pub label: String,
    pub job_id: JobId,
    pub submitter: String,
    pub kind: JobKind,
    pub slot: SlotId,
    pub credential: Option<String>,
}

#[derive(Default)]
struct Recorder {
    started: Mutex<Vec<Execution>>,
    active_slots: Mutex<HashSet<SlotId>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    slot_shared: AtomicBool,
}

/// Executor that records every call. Clones share the recording.
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    recorder: Arc<Recorder>,
}

impl RecordingExecutor {
    pub fn started(&self) -> Vec<Execution> {
        self.recorder.started.lock().clone()
    }

    pub fn started_labels(&self) -> Vec<String> {
        self.started().into_iter().map(|e| e.label).collect()
    }

    pub fn active(&self) -> usize {
        self.recorder.active.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.recorder.peak.load(Ordering::SeqCst)
    }

    /// Whether two executions ever held the same slot at once.
    pub fn slot_was_shared(&self) -> bool {
        self.recorder.slot_shared.load(Ordering::SeqCst)
    }

    fn enter(&self, task: &Task, binding: &SlotBinding) -> ActiveCall {
        if !self.recorder.active_slots.lock().insert(binding.slot) {
            self.recorder.slot_shared.store(true, Ordering::SeqCst);
        }
        let now = self.recorder.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.recorder.peak.fetch_max(now, Ordering::SeqCst);
        self.recorder.started.lock().push(Execution {
            label: task.label.clone(),
            job_id: binding.job_id,
            submitter: binding.submitter.clone(),
            kind: binding.kind,
            slot: binding.slot,
            credential: binding.credential.as_ref().map(|c| c.expose().to_string()),
        });
        ActiveCall {
            recorder: Arc::clone(&self.recorder),
            slot: binding.slot,
        }
    }
}

struct ActiveCall {
    recorder: Arc<Recorder>,
    slot: SlotId,
}

impl Drop for ActiveCall {
    fn drop(&mut self) {
        self.recorder.active_slots.lock().remove(&self.slot);
        self.recorder.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobExecutor<Task, String> for RecordingExecutor {
    async fn execute(&self, task: Task, binding: SlotBinding) -> AppResult<String> {
        let _call = self.enter(&task, &binding);
        match &task.behavior {
            Behavior::Succeed => {}
            Behavior::Sleep(d) => tokio::time::sleep(*d).await,
            Behavior::Gated(gate) => gate.acquire().await?.forget(),
            Behavior::Fail => anyhow::bail!("upstream rejected {}", task.label),
            Behavior::Panic => panic!("executor crashed on {}", task.label),
        }
        Ok(format!("{}@{}", task.label, binding.slot))
    }
}

/// Pool with `n` credentials named `token-{slot}`.
pub fn token_pool(n: usize) -> CredentialPool {
    CredentialPool::with_credentials((0..n).map(|i| Credential::new(format!("token-{i}"))).collect())
}

/// Tokens for a pooled credential configuration.
pub fn tokens(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("token-{i}")).collect()
}

/// Poll `cond` until it holds, failing the test after two seconds.
pub async fn eventually(what: &str, cond: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}
