//! Tests for audit sinks

use credential_lot::core::{
    build_audit_event, AuditAction, AuditSink, InMemoryAuditSink, TracingAuditSink,
};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    let event = build_audit_event(
        Some("job-1".to_string()),
        "alice",
        AuditAction::Enqueue,
        None,
        Some("first".to_string()),
    );

    sink.record(event);
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].job_id.as_deref(), Some("job-1"));
    assert_eq!(events[0].submitter, "alice");
    assert_eq!(events[0].action, AuditAction::Enqueue);
    assert!(events[0].created_at_ms > 0);
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    for job in ["a", "b", "c"] {
        sink.record(build_audit_event(
            Some(job.to_string()),
            "alice",
            AuditAction::Start,
            Some(0),
            None,
        ));
    }

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].job_id.as_deref(), Some("b")); // oldest evicted
    assert_eq!(events[1].job_id.as_deref(), Some("c"));
}

#[test]
fn test_clones_share_events() {
    let reader = InMemoryAuditSink::new(8);
    let mut writer = reader.clone();

    writer.record(build_audit_event(None, "bob", AuditAction::Deny, None, None));
    writer.record(build_audit_event(None, "bob", AuditAction::Reset, None, None));

    assert_eq!(reader.events().len(), 2);
    assert_eq!(reader.events_with(AuditAction::Deny).len(), 1);
    assert!(reader.events_with(AuditAction::Complete).is_empty());
}

#[test]
fn test_event_ids_are_unique() {
    let a = build_audit_event(None, "alice", AuditAction::Fail, None, None);
    let b = build_audit_event(None, "alice", AuditAction::Fail, None, None);
    assert_ne!(a.event_id, b.event_id);
}

#[test]
fn test_event_serializes_action_in_snake_case() {
    let event = build_audit_event(None, "alice", AuditAction::Complete, Some(2), None);
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["action"], "complete");
    assert_eq!(json["slot"], 2);
}

#[test]
fn test_tracing_sink_accepts_events() {
    let mut sink = TracingAuditSink;
    sink.record(build_audit_event(None, "alice", AuditAction::Start, Some(0), None));
}
