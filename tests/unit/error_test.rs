//! Tests for error types

use std::time::Duration;

use credential_lot::core::{AdmissionDenied, JobError, SchedulerError};

#[test]
fn test_queue_full_error() {
    let err = SchedulerError::from(AdmissionDenied::QueueFull { cap: 3 });
    assert_eq!(format!("{err}"), "admission denied: submitter queue full (cap 3)");
}

#[test]
fn test_cooldown_error() {
    let err = SchedulerError::from(AdmissionDenied::CooldownActive {
        retry_after: Duration::from_secs(42),
    });
    assert_eq!(format!("{err}"), "admission denied: cooldown active, retry in 42s");
}

#[test]
fn test_resubmit_limit_error() {
    let err = SchedulerError::ResubmitLimit {
        requested: 9,
        max: 4,
    };
    assert_eq!(format!("{err}"), "resubmit count 9 outside 1..=4");
}

#[test]
fn test_permission_denied_error() {
    assert_eq!(format!("{}", SchedulerError::PermissionDenied), "permission denied");
    assert_eq!(
        format!("{}", SchedulerError::NoPreviousJob),
        "no previous job to resubmit"
    );
}

#[test]
fn test_job_errors() {
    let err = JobError::Executor(anyhow::anyhow!("upstream 429"));
    assert_eq!(format!("{err}"), "executor failure: upstream 429");
    assert_eq!(format!("{}", JobError::Abandoned), "job abandoned before completion");
}
