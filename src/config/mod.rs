//! Configuration models for the credential pool and admission policy.

pub mod scheduler;

pub use scheduler::{CredentialConfig, SchedulerConfig, ENV_PREFIX};
