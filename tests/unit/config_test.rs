//! Tests for configuration validation and loading

use std::collections::HashMap;
use std::time::Duration;

use credential_lot::config::{CredentialConfig, SchedulerConfig};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn test_defaults() {
    let cfg = SchedulerConfig::default();
    assert_eq!(cfg.credentials, CredentialConfig::None);
    assert_eq!(cfg.max_user_queue_size, 3);
    assert_eq!(cfg.penalty_cooldown_secs, 60);
    assert_eq!(cfg.max_resubmit_count, 4);
    assert_eq!(cfg.resubmit_handoff(), Duration::from_millis(100));
    assert!(cfg.validate().is_ok());

    let policy = cfg.admission_policy();
    assert_eq!(policy.max_per_submitter, 3);
    assert_eq!(policy.penalty, Duration::from_secs(60));
}

#[test]
fn test_zero_cap_is_invalid() {
    let cfg = SchedulerConfig {
        max_user_queue_size: 0,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_zero_resubmit_count_is_invalid() {
    let cfg = SchedulerConfig {
        max_resubmit_count: 0,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_blank_credentials_are_invalid() {
    let pooled = SchedulerConfig {
        credentials: CredentialConfig::Pooled(vec![" ".into(), String::new()]),
        ..SchedulerConfig::default()
    };
    assert!(pooled.validate().is_err());

    let single = SchedulerConfig {
        credentials: CredentialConfig::Single("  ".into()),
        ..SchedulerConfig::default()
    };
    assert!(single.validate().is_err());
}

#[test]
fn test_slot_counts() {
    let pooled = CredentialConfig::Pooled(vec!["a".into(), " ".into(), "c".into()]);
    assert_eq!(pooled.slot_count(), 2);
    let exposed: Vec<String> = pooled
        .credentials()
        .iter()
        .map(|c| c.expose().to_string())
        .collect();
    assert_eq!(exposed, vec!["a", "c"]);

    assert_eq!(CredentialConfig::Single("tok".into()).slot_count(), 1);
    assert_eq!(CredentialConfig::None.slot_count(), 1);
    assert!(CredentialConfig::None.credentials().is_empty());
}

#[test]
fn test_from_json_applies_defaults() {
    let cfg = SchedulerConfig::from_json_str(
        r#"{ "credentials": { "pooled": ["t1", "t2"] }, "max_user_queue_size": 5 }"#,
    )
    .unwrap();
    assert_eq!(cfg.credentials.slot_count(), 2);
    assert_eq!(cfg.max_user_queue_size, 5);
    assert_eq!(cfg.penalty_cooldown_secs, 60);
}

#[test]
fn test_from_json_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str("{ not json").is_err());
    assert!(SchedulerConfig::from_json_str(r#"{ "max_user_queue_size": 0 }"#).is_err());
}

#[test]
fn test_from_lookup_reads_prefixed_vars() {
    let cfg = SchedulerConfig::from_lookup(lookup(&[
        ("CREDLOT_TOKENS", "alpha, beta ,gamma"),
        ("CREDLOT_MAX_USER_QUEUE_SIZE", "2"),
        ("CREDLOT_PENALTY_COOLDOWN_SECS", "15"),
        ("CREDLOT_MAX_RESUBMIT_COUNT", "6"),
        ("CREDLOT_RESUBMIT_HANDOFF_DELAY_MS", "0"),
    ]))
    .unwrap();
    assert_eq!(
        cfg.credentials,
        CredentialConfig::Pooled(vec!["alpha".into(), "beta".into(), "gamma".into()])
    );
    assert_eq!(cfg.max_user_queue_size, 2);
    assert_eq!(cfg.penalty_cooldown_secs, 15);
    assert_eq!(cfg.max_resubmit_count, 6);
    assert_eq!(cfg.resubmit_handoff(), Duration::ZERO);
}

#[test]
fn test_single_token_becomes_single_credential() {
    let cfg = SchedulerConfig::from_lookup(lookup(&[("CREDLOT_TOKENS", "only")])).unwrap();
    assert_eq!(cfg.credentials, CredentialConfig::Single("only".into()));
}

#[test]
fn test_blank_tokens_mean_credential_less() {
    for raw in ["", "  ", " , ,"] {
        let cfg = SchedulerConfig::from_lookup(lookup(&[("CREDLOT_TOKENS", raw)])).unwrap();
        assert_eq!(cfg.credentials, CredentialConfig::None, "tokens {raw:?}");
    }

    let cfg = SchedulerConfig::from_lookup(lookup(&[("CREDLOT_TOKENS", " ,solo, ")])).unwrap();
    assert_eq!(cfg.credentials, CredentialConfig::Single("solo".into()));
}

#[test]
fn test_unset_vars_keep_defaults() {
    let cfg = SchedulerConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(cfg, SchedulerConfig::default());
}

#[test]
fn test_unparsable_var_names_the_variable() {
    let err = SchedulerConfig::from_lookup(lookup(&[("CREDLOT_MAX_USER_QUEUE_SIZE", "lots")]))
        .unwrap_err();
    assert!(err.contains("CREDLOT_MAX_USER_QUEUE_SIZE"));
}
