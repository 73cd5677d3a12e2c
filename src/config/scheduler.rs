//! Scheduler configuration structures.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{AdmissionPolicy, Credential};

/// Prefix of environment variables read by [`SchedulerConfig::from_env`].
pub const ENV_PREFIX: &str = "CREDLOT_";

/// How upstream credentials are supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialConfig {
    /// Several credentials, one concurrent request each.
    Pooled(Vec<String>),
    /// One shared credential; scheduling is serial.
    Single(String),
    /// No credentials (e.g. login-based upstream); scheduling is serial.
    #[default]
    None,
}

impl CredentialConfig {
    /// Usable credentials, with blank entries dropped.
    #[must_use]
    pub fn credentials(&self) -> Vec<Credential> {
        match self {
            Self::Pooled(tokens) => tokens
                .iter()
                .enumerate()
                .filter_map(|(index, token)| {
                    let token = token.trim();
                    if token.is_empty() {
                        tracing::warn!(index, "blank credential skipped");
                        None
                    } else {
                        Some(Credential::new(token))
                    }
                })
                .collect(),
            Self::Single(token) if !token.trim().is_empty() => {
                vec![Credential::new(token.trim())]
            }
            Self::Single(_) | Self::None => Vec::new(),
        }
    }

    /// Number of credential slots this configuration yields.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        match self {
            Self::Pooled(_) => self.credentials().len().max(1),
            Self::Single(_) | Self::None => 1,
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Self::Pooled(tokens) if tokens.iter().all(|t| t.trim().is_empty()) => {
                Err("pooled credentials contain no usable token".into())
            }
            Self::Single(token) if token.trim().is_empty() => {
                Err("single credential is blank".into())
            }
            _ => Ok(()),
        }
    }
}

const fn default_max_user_queue_size() -> usize {
    3
}

const fn default_penalty_cooldown_secs() -> u64 {
    60
}

const fn default_max_resubmit_count() -> usize {
    4
}

const fn default_resubmit_handoff_delay_ms() -> u64 {
    100
}

/// Root scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Upstream credentials.
    #[serde(default)]
    pub credentials: CredentialConfig,
    /// Maximum outstanding jobs per submitter.
    #[serde(default = "default_max_user_queue_size")]
    pub max_user_queue_size: usize,
    /// Cooldown imposed when a submitter hits the cap, in seconds.
    #[serde(default = "default_penalty_cooldown_secs")]
    pub penalty_cooldown_secs: u64,
    /// Largest batch a single resubmission may enqueue.
    #[serde(default = "default_max_resubmit_count")]
    pub max_resubmit_count: usize,
    /// Pause before the resubmit lock passes to the next waiter, in ms.
    #[serde(default = "default_resubmit_handoff_delay_ms")]
    pub resubmit_handoff_delay_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            credentials: CredentialConfig::default(),
            max_user_queue_size: default_max_user_queue_size(),
            penalty_cooldown_secs: default_penalty_cooldown_secs(),
            max_resubmit_count: default_max_resubmit_count(),
            resubmit_handoff_delay_ms: default_resubmit_handoff_delay_ms(),
        }
    }
}

impl SchedulerConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_user_queue_size == 0 {
            return Err("max_user_queue_size must be greater than 0".into());
        }
        if self.max_resubmit_count == 0 {
            return Err("max_resubmit_count must be greater than 0".into());
        }
        self.credentials
            .validate()
            .map_err(|e| format!("credentials invalid: {e}"))
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `CREDLOT_*` environment variables, loading a
    /// `.env` file first if one exists.
    ///
    /// `CREDLOT_TOKENS` is a comma-separated credential list. Blank entries
    /// are skipped: one remaining entry yields a single credential and none
    /// at all means credential-less. The numeric variables mirror the struct
    /// fields in upper case. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a description of an unparsable variable or failed validation.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (used by
    /// [`from_env`](Self::from_env)).
    ///
    /// # Errors
    ///
    /// Returns a description of an unparsable value or failed validation.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut cfg = Self::default();

        if let Some(raw) = get("TOKENS") {
            let mut tokens: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_owned)
                .collect();
            cfg.credentials = match tokens.len() {
                0 => CredentialConfig::None,
                1 => CredentialConfig::Single(tokens.swap_remove(0)),
                _ => CredentialConfig::Pooled(tokens),
            };
        }
        if let Some(v) = get("MAX_USER_QUEUE_SIZE") {
            cfg.max_user_queue_size = parse_var("MAX_USER_QUEUE_SIZE", &v)?;
        }
        if let Some(v) = get("PENALTY_COOLDOWN_SECS") {
            cfg.penalty_cooldown_secs = parse_var("PENALTY_COOLDOWN_SECS", &v)?;
        }
        if let Some(v) = get("MAX_RESUBMIT_COUNT") {
            cfg.max_resubmit_count = parse_var("MAX_RESUBMIT_COUNT", &v)?;
        }
        if let Some(v) = get("RESUBMIT_HANDOFF_DELAY_MS") {
            cfg.resubmit_handoff_delay_ms = parse_var("RESUBMIT_HANDOFF_DELAY_MS", &v)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Admission policy derived from this configuration.
    #[must_use]
    pub const fn admission_policy(&self) -> AdmissionPolicy {
        AdmissionPolicy {
            max_per_submitter: self.max_user_queue_size,
            penalty: Duration::from_secs(self.penalty_cooldown_secs),
        }
    }

    /// Resubmit lock hand-off delay.
    #[must_use]
    pub const fn resubmit_handoff(&self) -> Duration {
        Duration::from_millis(self.resubmit_handoff_delay_ms)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| format!("{ENV_PREFIX}{name}: {e}"))
}
