//! # Credential Lot
//!
//! A credential-pool job scheduler for front ends that forward user requests
//! to a rate-limited upstream service.
//!
//! Each request is a job. Jobs wait in a single FIFO queue until one of a
//! fixed number of credential slots frees up; the job is then bound to that
//! slot, its executor makes exactly one upstream call with the slot's
//! credential, and the slot goes back to the pool when the job settles. At
//! most one job uses a given credential at any moment.
//!
//! ## Key Features
//!
//! - **Credential Pool**: One slot per token, or a single slot in
//!   credential-less mode
//! - **Per-Submitter Admission**: In-flight cap with a cooldown penalty for
//!   submitters that hit it
//! - **Exactly-Once Settlement**: Slots and ledger units come back on every
//!   exit path, including executor panics
//! - **Contiguous Resubmission**: Batches of replayed jobs are serialized by a
//!   FIFO hand-off mutex and enqueued back to back
//! - **Audit Trail**: Optional sink receiving enqueue, start, settle, deny and
//!   reset events
//!
//! ## Usage
//!
//! ```rust,ignore
//! use credential_lot::builders::SchedulerBuilder;
//! use credential_lot::config::SchedulerConfig;
//! use credential_lot::runtime::{SubmissionGate, TokioSpawner};
//!
//! let config = SchedulerConfig::from_env()?;
//! let max_resubmit = config.max_resubmit_count;
//! let scheduler = SchedulerBuilder::new(config).build(my_executor, TokioSpawner::current())?;
//! let gate = SubmissionGate::new(scheduler, max_resubmit);
//!
//! let submitted = gate.submit("alice", "a lighthouse at dusk".to_string())?;
//! println!("{} jobs ahead or running", submitted.status.total_outstanding);
//! let image = submitted.handle.wait().await?;
//!
//! let redraws = gate.resubmit("alice", 2).await?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions and credential accounting.
pub mod core;
/// Configuration models for the pool and admission policy.
pub mod config;
/// Builders to construct a scheduler from configuration.
pub mod builders;
/// Infrastructure adapters (work queue).
pub mod infra;
/// Runtime adapters and the submission API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
