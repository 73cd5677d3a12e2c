//! Tests for the scheduler builder

use std::sync::Arc;

use async_trait::async_trait;

use credential_lot::builders::SchedulerBuilder;
use credential_lot::config::{CredentialConfig, SchedulerConfig};
use credential_lot::core::{
    AppResult, InMemoryAuditSink, Job, JobExecutor, SchedulerError, SlotBinding,
};
use credential_lot::runtime::TokioSpawner;
use credential_lot::util::clock::ManualClock;

struct EchoExecutor;

#[async_trait]
impl JobExecutor<String, String> for EchoExecutor {
    async fn execute(&self, payload: String, binding: SlotBinding) -> AppResult<String> {
        let token = binding
            .credential
            .as_ref()
            .map_or("anonymous", |c| c.expose())
            .to_string();
        Ok(format!("{payload} via {token}"))
    }
}

#[test]
fn test_builder_exposes_config() {
    let config = SchedulerConfig {
        max_user_queue_size: 7,
        ..SchedulerConfig::default()
    };
    let builder = SchedulerBuilder::new(config);
    assert_eq!(builder.config().max_user_queue_size, 7);
}

#[tokio::test]
async fn test_builder_rejects_invalid_config() {
    let config = SchedulerConfig {
        max_user_queue_size: 0,
        ..SchedulerConfig::default()
    };
    let result = SchedulerBuilder::new(config).build(EchoExecutor, TokioSpawner::current());
    assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
}

#[tokio::test]
async fn test_credential_less_scheduler_is_serial() {
    let scheduler = SchedulerBuilder::new(SchedulerConfig::default())
        .build(EchoExecutor, TokioSpawner::current())
        .unwrap();
    assert_eq!(scheduler.pool().size(), 1);

    let out = scheduler
        .submit(Job::ordinary("alice", "sunset".to_string()))
        .wait()
        .await
        .unwrap();
    assert_eq!(out, "sunset via anonymous");
}

#[tokio::test]
async fn test_builder_wires_credentials_clock_and_audit() {
    let config = SchedulerConfig {
        credentials: CredentialConfig::Single("secret".into()),
        ..SchedulerConfig::default()
    };
    let audit = InMemoryAuditSink::new(16);
    let scheduler = SchedulerBuilder::new(config)
        .clock(Arc::new(ManualClock::new(0)))
        .audit(Box::new(audit.clone()))
        .build(EchoExecutor, TokioSpawner::current())
        .unwrap();

    let out = scheduler
        .submit(Job::ordinary("alice", "moon".to_string()))
        .wait()
        .await
        .unwrap();
    assert_eq!(out, "moon via secret");
    assert!(!audit.events().is_empty());
    assert_eq!(scheduler.ledger().policy().max_per_submitter, 3);
}
